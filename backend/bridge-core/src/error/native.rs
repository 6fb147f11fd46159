use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failure reported by a platform SDK.
#[derive(Debug, Clone, ThisError)]
pub enum NativeError {
    /// The native call ran and rejected the request.
    #[error("Native Operation Error: {message} {location}")]
    Operation {
        message: String,
        location: ErrorLocation,
    },

    /// The backend cannot provide this capability on this host.
    #[error("Native Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },
}
