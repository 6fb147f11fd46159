use crate::ar::{ArFrame, ArTrackingState};
use crate::device::DeviceInfo;
use crate::gamepad::GamepadInputEvent;
use crate::handle::Handle;
use crate::rtc::{DataBuffer, DataChannelState, IceCandidate, MediaKind, PeerConnectionState};

use serde::Serialize;

/// Everything the host pushes to the remote client without being asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    PeerConnectionStateChanged {
        connection: Handle,
        state: PeerConnectionState,
    },
    IceCandidate {
        connection: Handle,
        candidate: IceCandidate,
    },
    DataChannel {
        connection: Handle,
        data_channel: Handle,
    },
    Track {
        connection: Handle,
        track: Handle,
        kind: MediaKind,
    },
    DataChannelStateChanged {
        data_channel: Handle,
        state: DataChannelState,
    },
    DataChannelMessage {
        data_channel: Handle,
        buffer: DataBuffer,
    },
    VideoFrameSizeChanged {
        controller: Handle,
        width: i64,
        height: i64,
    },
    ArTrackingStateChanged {
        session: Handle,
        state: ArTrackingState,
    },
    ArFrame {
        session: Handle,
        frame: ArFrame,
    },
    GamepadConnected {
        gamepad: Handle,
    },
    GamepadDisconnected {
        gamepad: Handle,
    },
    GamepadInput(GamepadInputEvent),
    DevicesUpdated {
        scanner: Handle,
        devices: Vec<DeviceInfo>,
    },
}

impl BridgeEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::PeerConnectionStateChanged { .. } => "peer_connection_state_changed",
            BridgeEvent::IceCandidate { .. } => "ice_candidate",
            BridgeEvent::DataChannel { .. } => "data_channel",
            BridgeEvent::Track { .. } => "track",
            BridgeEvent::DataChannelStateChanged { .. } => "data_channel_state_changed",
            BridgeEvent::DataChannelMessage { .. } => "data_channel_message",
            BridgeEvent::VideoFrameSizeChanged { .. } => "video_frame_size_changed",
            BridgeEvent::ArTrackingStateChanged { .. } => "ar_tracking_state_changed",
            BridgeEvent::ArFrame { .. } => "ar_frame",
            BridgeEvent::GamepadConnected { .. } => "gamepad_connected",
            BridgeEvent::GamepadDisconnected { .. } => "gamepad_disconnected",
            BridgeEvent::GamepadInput(_) => "gamepad_input",
            BridgeEvent::DevicesUpdated { .. } => "devices_updated",
        }
    }
}
