use crate::error::model_error::ModelError;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// An ICE candidate, either gathered locally or supplied by the remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: String,
    pub sdp_mline_index: u16,
}

/// Builder for candidates arriving from the wire, where the m-line index is a
/// signed 64-bit integer and every field is optional.
#[derive(Debug, Default)]
pub struct IceCandidateBuilder {
    candidate: Option<String>,
    sdp_mid: Option<String>,
    sdp_mline_index: Option<i64>,
}

impl IceCandidateBuilder {
    pub fn with_candidate(mut self, candidate: impl Into<String>) -> Self {
        self.candidate = Some(candidate.into());
        self
    }

    pub fn with_sdp_mid(mut self, sdp_mid: impl Into<String>) -> Self {
        self.sdp_mid = Some(sdp_mid.into());
        self
    }

    pub fn with_sdp_mline_index(mut self, index: i64) -> Self {
        self.sdp_mline_index = Some(index);
        self
    }

    /// Build the candidate, rejecting empty candidate lines and m-line
    /// indices that do not fit the SDP range.
    #[track_caller]
    pub fn build(self) -> Result<IceCandidate, ModelError> {
        let candidate = self.candidate.ok_or_else(|| ModelError::Validation {
            message: String::from("Candidate is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if candidate.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Candidate cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let index = self.sdp_mline_index.unwrap_or(0);
        let sdp_mline_index = u16::try_from(index).map_err(|_| ModelError::Validation {
            message: format!("SDP m-line index out of range: {index}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(IceCandidate {
            candidate,
            sdp_mid: self.sdp_mid.unwrap_or_default(),
            sdp_mline_index,
        })
    }
}
