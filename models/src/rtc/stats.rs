use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of a statistics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcStats {
    pub timestamp_us: f64,
    pub stats_type: String,
    pub id: String,
    pub values: HashMap<String, String>,
}

/// Statistics gathered for one peer connection, keyed by stat-entry id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub timestamp_us: f64,
    pub stats: HashMap<String, RtcStats>,
}

impl StatsReport {
    /// Keep only entries whose type appears in `type_filter`.
    ///
    /// `None` keeps everything; an empty filter keeps nothing.
    pub fn retain_types(mut self, type_filter: Option<&[String]>) -> Self {
        if let Some(types) = type_filter {
            self.stats
                .retain(|_, entry| types.iter().any(|t| *t == entry.stats_type));
        }
        self
    }
}
