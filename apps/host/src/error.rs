use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the host process during startup.
///
/// Serialized as one JSON line on stderr so the launcher of the remote
/// client can tell why the bridge never came up.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum HostError {
    /// Error from the host process itself (logging, runtime, paths)
    #[error("Host Error: {message} {location}")]
    Host {
        message: String,
        location: ErrorLocation,
    },

    /// Config file could not be loaded or overridden
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// IPC server failed to start
    #[error("IPC Error: {message} {location}")]
    Ipc {
        message: String,
        location: ErrorLocation,
    },
}

impl HostError {
    /// Single-line JSON report of this error.
    pub fn to_report(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}
