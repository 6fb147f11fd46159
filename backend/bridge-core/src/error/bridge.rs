use crate::error::native::NativeError;

use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Recoverable failure of one remote command.
///
/// Reported to the single request that caused it; never tears down unrelated
/// resources.
#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("Native Error: {message} {location}")]
    Native {
        message: String,
        location: ErrorLocation,
        #[source]
        source: NativeError,
    },

    /// The resource was disposed while the command was in flight.
    #[error("Disposed Error: {message} {location}")]
    Disposed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Argument Error: {message} {location}")]
    InvalidArgument {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    /// The native layer dropped a completion without invoking it.
    #[error("Abandoned Error: {message} {location}")]
    Abandoned {
        message: String,
        location: ErrorLocation,
    },
}

impl From<NativeError> for BridgeError {
    #[track_caller]
    fn from(error: NativeError) -> Self {
        BridgeError::Native {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: error,
        }
    }
}

impl From<ModelError> for BridgeError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        BridgeError::InvalidArgument {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
