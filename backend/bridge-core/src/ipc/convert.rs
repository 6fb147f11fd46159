//! Domain ↔ wire conversions.
//!
//! Outbound conversions are infallible `From` impls. Inbound ones validate and
//! fail with [`BridgeError::InvalidArgument`].

use crate::error::bridge::BridgeError;
use crate::proto::{
    ArAvailabilityKind, ArTrackingStateKind, DeviceProductKind, GamepadInputKind,
    GamepadInputTypeKind, IpcArFrameEvent, IpcArTrackingStateEvent, IpcDataChannelEvent,
    IpcDataChannelMessageEvent, IpcDataChannelStateEvent, IpcDevicesUpdatedEvent, IpcErrorCode,
    IpcEvent, IpcGamepadEvent, IpcGamepadInputEvent, IpcIceCandidateEvent,
    IpcPeerConnectionStateEvent, IpcTrackEvent, IpcVideoFrameSizeEvent, RtcDataBuffer,
    RtcDataChannelInit, RtcDataChannelState, RtcIceCandidate, RtcMediaKind,
    RtcPeerConnectionState, RtcSdpType, RtcSessionDescription, RtcStats, RtcStatsReport,
    ScanDevice, ipc_event,
};

use common::ErrorLocation;
use models::BridgeEvent;
use models::ar::{ArAvailability, ArTrackingState};
use models::device::{DeviceInfo, DeviceProductId};
use models::gamepad::{GamepadInput, GamepadInputType};
use models::rtc::{
    DataBuffer, DataChannelInit, DataChannelState, IceCandidate, IceCandidateBuilder, MediaKind,
    PeerConnectionState, SessionDescription, SessionDescriptionType, StatsReport,
};

use std::panic::Location;

#[track_caller]
fn invalid(message: impl Into<String>) -> BridgeError {
    BridgeError::InvalidArgument {
        message: message.into(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Wire code reported for a failed command.
pub(crate) fn error_code(error: &BridgeError) -> IpcErrorCode {
    match error {
        BridgeError::Native { .. } | BridgeError::Abandoned { .. } => IpcErrorCode::NativeError,
        BridgeError::Disposed { .. } => IpcErrorCode::Disposed,
        BridgeError::InvalidArgument { .. } => IpcErrorCode::InvalidArgument,
        BridgeError::Timeout { .. } => IpcErrorCode::Timeout,
    }
}

// ============================================
// ENUMS
// ============================================

impl From<PeerConnectionState> for RtcPeerConnectionState {
    fn from(state: PeerConnectionState) -> Self {
        match state {
            PeerConnectionState::New => Self::New,
            PeerConnectionState::Connecting => Self::Connecting,
            PeerConnectionState::Connected => Self::Connected,
            PeerConnectionState::Disconnected => Self::Disconnected,
            PeerConnectionState::Failed => Self::Failed,
            PeerConnectionState::Closed => Self::Closed,
        }
    }
}

impl From<DataChannelState> for RtcDataChannelState {
    fn from(state: DataChannelState) -> Self {
        match state {
            DataChannelState::Connecting => Self::Connecting,
            DataChannelState::Open => Self::Open,
            DataChannelState::Closing => Self::Closing,
            DataChannelState::Closed => Self::Closed,
        }
    }
}

impl From<SessionDescriptionType> for RtcSdpType {
    fn from(sdp_type: SessionDescriptionType) -> Self {
        match sdp_type {
            SessionDescriptionType::Offer => Self::Offer,
            SessionDescriptionType::Pranswer => Self::Pranswer,
            SessionDescriptionType::Answer => Self::Answer,
            SessionDescriptionType::Rollback => Self::Rollback,
        }
    }
}

impl From<MediaKind> for RtcMediaKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => Self::Audio,
            MediaKind::Video => Self::Video,
        }
    }
}

impl From<ArAvailability> for ArAvailabilityKind {
    fn from(availability: ArAvailability) -> Self {
        match availability {
            ArAvailability::Available => Self::Available,
            ArAvailability::NotSupported => Self::NotSupported,
        }
    }
}

impl From<ArTrackingState> for ArTrackingStateKind {
    fn from(state: ArTrackingState) -> Self {
        match state {
            ArTrackingState::Unavailable => Self::Unavailable,
            ArTrackingState::Limited => Self::Limited,
            ArTrackingState::Normal => Self::Normal,
        }
    }
}

impl From<GamepadInput> for GamepadInputKind {
    fn from(input: GamepadInput) -> Self {
        match input {
            GamepadInput::ThumbstickLeftX => Self::ThumbstickLeftX,
            GamepadInput::ThumbstickLeftY => Self::ThumbstickLeftY,
            GamepadInput::ThumbstickRightX => Self::ThumbstickRightX,
            GamepadInput::ThumbstickRightY => Self::ThumbstickRightY,
            GamepadInput::ThumbstickLeftButton => Self::ThumbstickLeftButton,
            GamepadInput::ThumbstickRightButton => Self::ThumbstickRightButton,
            GamepadInput::TriggerAxisLeft => Self::TriggerAxisLeft,
            GamepadInput::TriggerAxisRight => Self::TriggerAxisRight,
            GamepadInput::TriggerButtonLeft => Self::TriggerButtonLeft,
            GamepadInput::TriggerButtonRight => Self::TriggerButtonRight,
            GamepadInput::DpadUp => Self::DpadUp,
            GamepadInput::DpadDown => Self::DpadDown,
            GamepadInput::DpadLeft => Self::DpadLeft,
            GamepadInput::DpadRight => Self::DpadRight,
            GamepadInput::FaceButtonBottom => Self::FaceButtonBottom,
            GamepadInput::FaceButtonRight => Self::FaceButtonRight,
            GamepadInput::FaceButtonLeft => Self::FaceButtonLeft,
            GamepadInput::FaceButtonTop => Self::FaceButtonTop,
            GamepadInput::ShoulderButtonLeft => Self::ShoulderButtonLeft,
            GamepadInput::ShoulderButtonRight => Self::ShoulderButtonRight,
            GamepadInput::SpecialButtonLeft => Self::SpecialButtonLeft,
            GamepadInput::SpecialButtonRight => Self::SpecialButtonRight,
        }
    }
}

impl From<GamepadInputType> for GamepadInputTypeKind {
    fn from(input_type: GamepadInputType) -> Self {
        match input_type {
            GamepadInputType::Button => Self::Button,
            GamepadInputType::Axis => Self::Axis,
        }
    }
}

impl From<DeviceProductId> for DeviceProductKind {
    fn from(product_id: DeviceProductId) -> Self {
        match product_id {
            DeviceProductId::SyncE => Self::SyncE,
            DeviceProductId::TrackE => Self::TrackE,
            DeviceProductId::Generic => Self::Generic,
        }
    }
}

// ============================================
// OUTBOUND MESSAGES
// ============================================

impl From<SessionDescription> for RtcSessionDescription {
    fn from(description: SessionDescription) -> Self {
        Self {
            sdp_type: RtcSdpType::from(description.sdp_type) as i32,
            sdp: description.sdp,
        }
    }
}

impl From<IceCandidate> for RtcIceCandidate {
    fn from(candidate: IceCandidate) -> Self {
        Self {
            candidate: Some(candidate.candidate),
            sdp_mid: Some(candidate.sdp_mid),
            sdp_mline_index: Some(i64::from(candidate.sdp_mline_index)),
        }
    }
}

impl From<DataBuffer> for RtcDataBuffer {
    fn from(buffer: DataBuffer) -> Self {
        Self {
            data: buffer.data,
            is_binary: buffer.is_binary,
        }
    }
}

impl From<StatsReport> for RtcStatsReport {
    fn from(report: StatsReport) -> Self {
        Self {
            timestamp_us: report.timestamp_us,
            stats: report
                .stats
                .into_iter()
                .map(|(id, entry)| {
                    let entry = RtcStats {
                        timestamp_us: entry.timestamp_us,
                        stats_type: entry.stats_type,
                        id: entry.id,
                        values: entry.values,
                    };
                    (id, entry)
                })
                .collect(),
        }
    }
}

impl From<DeviceInfo> for ScanDevice {
    fn from(device: DeviceInfo) -> Self {
        Self {
            identifier: device.identifier,
            name: device.name,
            product_id: DeviceProductKind::from(device.product_id) as i32,
            is_in_green_mode: device.is_in_green_mode,
            is_charging: device.is_charging,
            is_drop_frame: device.is_drop_frame,
            battery_level: device.battery_level,
            frame_rate: device.frame_rate,
            icon_index: device.icon_index,
            signal_strength: device.signal_strength,
            last_seen_timestamp: device.last_seen_timestamp,
        }
    }
}

impl From<BridgeEvent> for IpcEvent {
    fn from(event: BridgeEvent) -> Self {
        use ipc_event::Event;

        let event = match event {
            BridgeEvent::PeerConnectionStateChanged { connection, state } => {
                Event::PeerConnectionState(IpcPeerConnectionStateEvent {
                    connection,
                    state: RtcPeerConnectionState::from(state) as i32,
                })
            }
            BridgeEvent::IceCandidate {
                connection,
                candidate,
            } => Event::IceCandidate(IpcIceCandidateEvent {
                connection,
                candidate: Some(candidate.into()),
            }),
            BridgeEvent::DataChannel {
                connection,
                data_channel,
            } => Event::DataChannel(IpcDataChannelEvent {
                connection,
                data_channel,
            }),
            BridgeEvent::Track {
                connection,
                track,
                kind,
            } => Event::Track(IpcTrackEvent {
                connection,
                track,
                kind: RtcMediaKind::from(kind) as i32,
            }),
            BridgeEvent::DataChannelStateChanged {
                data_channel,
                state,
            } => Event::DataChannelState(IpcDataChannelStateEvent {
                data_channel,
                state: RtcDataChannelState::from(state) as i32,
            }),
            BridgeEvent::DataChannelMessage {
                data_channel,
                buffer,
            } => Event::DataChannelMessage(IpcDataChannelMessageEvent {
                data_channel,
                buffer: Some(buffer.into()),
            }),
            BridgeEvent::VideoFrameSizeChanged {
                controller,
                width,
                height,
            } => Event::VideoFrameSize(IpcVideoFrameSizeEvent {
                controller,
                width,
                height,
            }),
            BridgeEvent::ArTrackingStateChanged { session, state } => {
                Event::ArTrackingState(IpcArTrackingStateEvent {
                    session,
                    state: ArTrackingStateKind::from(state) as i32,
                })
            }
            BridgeEvent::ArFrame { session, frame } => Event::ArFrame(IpcArFrameEvent {
                session,
                camera_transform: frame.transform_bytes(),
            }),
            BridgeEvent::GamepadConnected { gamepad } => {
                Event::GamepadConnected(IpcGamepadEvent { gamepad })
            }
            BridgeEvent::GamepadDisconnected { gamepad } => {
                Event::GamepadDisconnected(IpcGamepadEvent { gamepad })
            }
            BridgeEvent::GamepadInput(input) => Event::GamepadInput(IpcGamepadInputEvent {
                gamepad: input.gamepad,
                input: GamepadInputKind::from(input.input) as i32,
                input_type: GamepadInputTypeKind::from(input.input_type) as i32,
                value: input.value,
            }),
            BridgeEvent::DevicesUpdated { scanner, devices } => {
                Event::DevicesUpdated(IpcDevicesUpdatedEvent {
                    scanner,
                    devices: devices.into_iter().map(ScanDevice::from).collect(),
                })
            }
        };
        IpcEvent { event: Some(event) }
    }
}

// ============================================
// INBOUND MESSAGES
// ============================================

#[track_caller]
pub(crate) fn session_description(
    description: Option<RtcSessionDescription>,
) -> Result<SessionDescription, BridgeError> {
    let description = description.ok_or_else(|| invalid("Session description is required"))?;
    let sdp_type = match description.sdp_type() {
        RtcSdpType::Offer => SessionDescriptionType::Offer,
        RtcSdpType::Pranswer => SessionDescriptionType::Pranswer,
        RtcSdpType::Answer => SessionDescriptionType::Answer,
        RtcSdpType::Rollback => SessionDescriptionType::Rollback,
        RtcSdpType::Unspecified => {
            return Err(invalid(format!(
                "Unknown session description type: {}",
                description.sdp_type
            )));
        }
    };
    Ok(SessionDescription::new(sdp_type, description.sdp))
}

#[track_caller]
pub(crate) fn ice_candidate(candidate: Option<RtcIceCandidate>) -> Result<IceCandidate, BridgeError> {
    let candidate = candidate.ok_or_else(|| invalid("ICE candidate is required"))?;
    let mut builder = IceCandidateBuilder::default();
    if let Some(line) = candidate.candidate {
        builder = builder.with_candidate(line);
    }
    if let Some(sdp_mid) = candidate.sdp_mid {
        builder = builder.with_sdp_mid(sdp_mid);
    }
    if let Some(index) = candidate.sdp_mline_index {
        builder = builder.with_sdp_mline_index(index);
    }
    Ok(builder.build()?)
}

pub(crate) fn data_buffer(buffer: Option<RtcDataBuffer>) -> DataBuffer {
    let buffer = buffer.unwrap_or_default();
    DataBuffer {
        data: buffer.data,
        is_binary: buffer.is_binary,
    }
}

#[track_caller]
fn narrow(field: &str, value: Option<u32>) -> Result<Option<u16>, BridgeError> {
    value
        .map(|v| u16::try_from(v).map_err(|_| invalid(format!("{field} out of range: {v}"))))
        .transpose()
}

/// Missing init means defaults (ordered, reliable, in-band negotiation).
#[track_caller]
pub(crate) fn data_channel_init(
    init: Option<RtcDataChannelInit>,
) -> Result<DataChannelInit, BridgeError> {
    let Some(init) = init else {
        return Ok(DataChannelInit::default());
    };
    let max_retransmits = narrow("max_retransmits", init.max_retransmits)?;
    let max_packet_life_time_ms = narrow("max_packet_life_time_ms", init.max_packet_life_time_ms)?;
    if max_retransmits.is_some() && max_packet_life_time_ms.is_some() {
        return Err(invalid(
            "max_retransmits and max_packet_life_time_ms are mutually exclusive",
        ));
    }
    Ok(DataChannelInit {
        ordered: init.ordered,
        max_retransmits,
        max_packet_life_time_ms,
        protocol: init.protocol,
        negotiated_id: narrow("negotiated_id", init.negotiated_id)?,
    })
}
