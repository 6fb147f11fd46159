//! WebRTC resources: peer connections, the tracks and data channels they
//! spawn, and the video views that render tracks.

mod data_channel;
mod data_channel_api;
mod media_track;
mod peer_connection;
mod peer_connection_api;
mod video_view;
mod video_view_api;

pub use data_channel::DataChannel;
pub use data_channel_api::DataChannelApi;
pub use media_track::MediaTrack;
pub use peer_connection::PeerConnection;
pub use peer_connection_api::PeerConnectionApi;
pub use video_view::VideoViewController;
pub use video_view_api::VideoViewApi;

use crate::native::{MediaConstraints, PeerConnectionConfig};

use std::collections::HashMap;

/// Settings applied to every peer connection a [`PeerConnectionApi`] creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcSettings {
    pub connection: PeerConnectionConfig,
    pub constraints: MediaConstraints,
    pub field_trials: HashMap<String, String>,
}

impl Default for RtcSettings {
    fn default() -> Self {
        Self {
            connection: PeerConnectionConfig {
                ice_servers: Vec::new(),
                continual_gathering: true,
            },
            constraints: MediaConstraints {
                offer_to_receive_audio: true,
                offer_to_receive_video: true,
            },
            field_trials: HashMap::new(),
        }
    }
}
