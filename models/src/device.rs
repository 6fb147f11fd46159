//! Timecode devices discovered over BLE.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProductId {
    SyncE,
    TrackE,
    Generic,
}

/// Snapshot of one cached device advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub product_id: DeviceProductId,
    pub is_in_green_mode: bool,
    pub is_charging: bool,
    pub is_drop_frame: bool,
    pub battery_level: i64,
    pub frame_rate: f64,
    pub icon_index: i64,
    pub signal_strength: i64,
    /// Seconds on the host's monotonic clock when the advert was last seen.
    pub last_seen_timestamp: f64,
}
