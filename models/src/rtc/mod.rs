//! Real-time media data exchanged with the remote client.

mod candidate;
mod stats;

pub use candidate::{IceCandidate, IceCandidateBuilder};
pub use stats::{RtcStats, StatsReport};

use crate::error::model_error::ModelError;

use common::ErrorLocation;

use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregate peer connection state, as reported by the native stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    pub fn is_closed(self) -> bool {
        self == PeerConnectionState::Closed
    }
}

/// Ready state of a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionDescriptionType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp_type: SessionDescriptionType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SessionDescriptionType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }
}

/// Kind of a media stream track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl FromStr for MediaKind {
    type Err = ModelError;

    #[track_caller]
    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(ModelError::Validation {
                message: format!("Unknown media track kind: {other}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// One message on a data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBuffer {
    pub data: Vec<u8>,
    pub is_binary: bool,
}

impl DataBuffer {
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            is_binary: true,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: text.into().into_bytes(),
            is_binary: false,
        }
    }
}

/// Options for an explicitly opened data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChannelInit {
    pub ordered: bool,
    pub max_retransmits: Option<u16>,
    pub max_packet_life_time_ms: Option<u16>,
    pub protocol: String,
    /// Pre-negotiated stream id; `None` lets the stack pick one in-band.
    pub negotiated_id: Option<u16>,
}

impl Default for DataChannelInit {
    fn default() -> Self {
        Self {
            ordered: true,
            max_retransmits: None,
            max_packet_life_time_ms: None,
            protocol: String::new(),
            negotiated_id: None,
        }
    }
}
