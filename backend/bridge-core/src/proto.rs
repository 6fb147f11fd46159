//! IPC wire messages.
//!
//! Derived directly with `prost` rather than generated, so building needs no
//! `protoc`. `proto/bridge.proto` at the crate root documents the same schema
//! for non-Rust clients; field tags here must stay in sync with it.

use std::collections::HashMap;

// ============================================
// ENVELOPES
// ============================================

/// Client → host.
#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcClientMessage {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(
        oneof = "ipc_client_message::Payload",
        tags = "10, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 40, 41, 50, 51, 52, 60, 61, 62, 63, 64, 70, 80, 81, 82, 83, 84"
    )]
    pub payload: Option<ipc_client_message::Payload>,
}

pub mod ipc_client_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "10")]
        AuthHandshake(super::IpcAuthHandshake),

        // Peer connections
        #[prost(message, tag = "20")]
        SetFieldTrials(super::IpcSetFieldTrialsRequest),
        #[prost(message, tag = "21")]
        CreatePeerConnection(super::IpcCreatePeerConnectionRequest),
        #[prost(message, tag = "22")]
        DisposePeerConnection(super::IpcPeerConnectionRequest),
        #[prost(message, tag = "23")]
        SetRemoteDescription(super::IpcSetDescriptionRequest),
        #[prost(message, tag = "24")]
        SetLocalDescription(super::IpcSetDescriptionRequest),
        #[prost(message, tag = "25")]
        AddRemoteCandidate(super::IpcAddRemoteCandidateRequest),
        #[prost(message, tag = "26")]
        CreateAnswer(super::IpcPeerConnectionRequest),
        #[prost(message, tag = "27")]
        CreateOffer(super::IpcPeerConnectionRequest),
        #[prost(message, tag = "28")]
        GetStats(super::IpcGetStatsRequest),
        #[prost(message, tag = "29")]
        CreateDataChannel(super::IpcCreateDataChannelRequest),

        // Data channels
        #[prost(message, tag = "40")]
        SendDataChannelMessage(super::IpcSendDataChannelMessageRequest),
        #[prost(message, tag = "41")]
        DisposeDataChannel(super::IpcDataChannelRequest),

        // Video views
        #[prost(message, tag = "50")]
        CreateVideoView(super::IpcEmptyRequest),
        #[prost(message, tag = "51")]
        SetVideoTrack(super::IpcSetVideoTrackRequest),
        #[prost(message, tag = "52")]
        DisposeVideoView(super::IpcVideoViewRequest),

        // AR
        #[prost(message, tag = "60")]
        InitializeAr(super::IpcEmptyRequest),
        #[prost(message, tag = "61")]
        CreateArSession(super::IpcEmptyRequest),
        #[prost(message, tag = "62")]
        RunArSession(super::IpcArSessionRequest),
        #[prost(message, tag = "63")]
        PauseArSession(super::IpcArSessionRequest),
        #[prost(message, tag = "64")]
        DisposeArSession(super::IpcArSessionRequest),

        // Gamepads
        #[prost(message, tag = "70")]
        GetActiveGamepads(super::IpcEmptyRequest),

        // Device scanning
        #[prost(message, tag = "80")]
        CreateScanner(super::IpcEmptyRequest),
        #[prost(message, tag = "81")]
        StartScanning(super::IpcScannerRequest),
        #[prost(message, tag = "82")]
        StopScanning(super::IpcScannerRequest),
        #[prost(message, tag = "83")]
        GetCachedDevices(super::IpcScannerRequest),
        #[prost(message, tag = "84")]
        DisposeScanner(super::IpcScannerRequest),
    }
}

/// Host → client. Events carry `request_id` 0.
#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcServerMessage {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(
        oneof = "ipc_server_message::Payload",
        tags = "10, 11, 12, 13, 14, 15, 16, 17, 18, 30"
    )]
    pub payload: Option<ipc_server_message::Payload>,
}

pub mod ipc_server_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "10")]
        AuthHandshakeResponse(super::IpcAuthHandshakeResponse),
        #[prost(message, tag = "11")]
        Error(super::IpcErrorResponse),
        #[prost(message, tag = "12")]
        Ack(super::IpcAck),
        #[prost(message, tag = "13")]
        Handle(super::IpcHandleResponse),
        #[prost(message, tag = "14")]
        SessionDescription(super::RtcSessionDescription),
        #[prost(message, tag = "15")]
        StatsReport(super::RtcStatsReport),
        #[prost(message, tag = "16")]
        ArAvailability(super::IpcArAvailabilityResponse),
        #[prost(message, tag = "17")]
        HandleList(super::IpcHandleListResponse),
        #[prost(message, tag = "18")]
        DeviceList(super::IpcDeviceListResponse),
        #[prost(message, tag = "30")]
        Event(super::IpcEvent),
    }
}

// ============================================
// HANDSHAKE / GENERIC RESPONSES
// ============================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcAuthHandshake {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcAuthHandshakeResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, optional, tag = "2")]
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcErrorResponse {
    #[prost(enumeration = "IpcErrorCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum IpcErrorCode {
    Unspecified = 0,
    AuthError = 1,
    InvalidMessage = 2,
    InternalError = 3,
    NativeError = 4,
    Disposed = 5,
    InvalidArgument = 6,
    Timeout = 7,
    /// The request addressed a handle that does not exist. The connection is
    /// closed after this response.
    ProtocolViolation = 8,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcAck {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcEmptyRequest {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcHandleResponse {
    /// `-1` when the native layer refused to create the resource.
    #[prost(int64, tag = "1")]
    pub handle: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcHandleListResponse {
    #[prost(int64, repeated, tag = "1")]
    pub handles: Vec<i64>,
}

// ============================================
// PEER CONNECTIONS
// ============================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcSetFieldTrialsRequest {
    #[prost(map = "string, string", tag = "1")]
    pub field_trials: HashMap<String, String>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcCreatePeerConnectionRequest {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcPeerConnectionRequest {
    #[prost(int64, tag = "1")]
    pub connection: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcSetDescriptionRequest {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(message, optional, tag = "2")]
    pub description: Option<RtcSessionDescription>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcAddRemoteCandidateRequest {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(message, optional, tag = "2")]
    pub candidate: Option<RtcIceCandidate>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcGetStatsRequest {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    /// Only applied when `filter_types` is set; an empty filter keeps nothing.
    #[prost(string, repeated, tag = "2")]
    pub type_filter: Vec<String>,
    #[prost(bool, tag = "3")]
    pub filter_types: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcCreateDataChannelRequest {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(string, tag = "2")]
    pub label: String,
    #[prost(message, optional, tag = "3")]
    pub init: Option<RtcDataChannelInit>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcSessionDescription {
    #[prost(enumeration = "RtcSdpType", tag = "1")]
    pub sdp_type: i32,
    #[prost(string, tag = "2")]
    pub sdp: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcIceCandidate {
    #[prost(string, optional, tag = "1")]
    pub candidate: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub sdp_mid: Option<String>,
    #[prost(int64, optional, tag = "3")]
    pub sdp_mline_index: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcDataChannelInit {
    #[prost(bool, tag = "1")]
    pub ordered: bool,
    #[prost(uint32, optional, tag = "2")]
    pub max_retransmits: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub max_packet_life_time_ms: Option<u32>,
    #[prost(string, tag = "4")]
    pub protocol: String,
    #[prost(uint32, optional, tag = "5")]
    pub negotiated_id: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcStats {
    #[prost(double, tag = "1")]
    pub timestamp_us: f64,
    #[prost(string, tag = "2")]
    pub stats_type: String,
    #[prost(string, tag = "3")]
    pub id: String,
    #[prost(map = "string, string", tag = "4")]
    pub values: HashMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcStatsReport {
    #[prost(double, tag = "1")]
    pub timestamp_us: f64,
    #[prost(map = "string, message", tag = "2")]
    pub stats: HashMap<String, RtcStats>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RtcSdpType {
    Unspecified = 0,
    Offer = 1,
    Pranswer = 2,
    Answer = 3,
    Rollback = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RtcPeerConnectionState {
    Unspecified = 0,
    New = 1,
    Connecting = 2,
    Connected = 3,
    Disconnected = 4,
    Failed = 5,
    Closed = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RtcMediaKind {
    Unspecified = 0,
    Audio = 1,
    Video = 2,
}

// ============================================
// DATA CHANNELS
// ============================================

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcDataChannelRequest {
    #[prost(int64, tag = "1")]
    pub data_channel: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcSendDataChannelMessageRequest {
    #[prost(int64, tag = "1")]
    pub data_channel: i64,
    #[prost(message, optional, tag = "2")]
    pub buffer: Option<RtcDataBuffer>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RtcDataBuffer {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub is_binary: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RtcDataChannelState {
    Unspecified = 0,
    Connecting = 1,
    Open = 2,
    Closing = 3,
    Closed = 4,
}

// ============================================
// VIDEO VIEWS
// ============================================

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcVideoViewRequest {
    #[prost(int64, tag = "1")]
    pub controller: i64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcSetVideoTrackRequest {
    #[prost(int64, tag = "1")]
    pub controller: i64,
    /// `-1` clears the view.
    #[prost(int64, tag = "2")]
    pub track: i64,
}

// ============================================
// AR
// ============================================

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcArSessionRequest {
    #[prost(int64, tag = "1")]
    pub session: i64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcArAvailabilityResponse {
    #[prost(enumeration = "ArAvailabilityKind", tag = "1")]
    pub availability: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ArAvailabilityKind {
    Unspecified = 0,
    Available = 1,
    NotSupported = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ArTrackingStateKind {
    Unspecified = 0,
    Unavailable = 1,
    Limited = 2,
    Normal = 3,
}

// ============================================
// GAMEPADS
// ============================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum GamepadInputKind {
    Unspecified = 0,
    ThumbstickLeftX = 1,
    ThumbstickLeftY = 2,
    ThumbstickRightX = 3,
    ThumbstickRightY = 4,
    ThumbstickLeftButton = 5,
    ThumbstickRightButton = 6,
    TriggerAxisLeft = 7,
    TriggerAxisRight = 8,
    TriggerButtonLeft = 9,
    TriggerButtonRight = 10,
    DpadUp = 11,
    DpadDown = 12,
    DpadLeft = 13,
    DpadRight = 14,
    FaceButtonBottom = 15,
    FaceButtonRight = 16,
    FaceButtonLeft = 17,
    FaceButtonTop = 18,
    ShoulderButtonLeft = 19,
    ShoulderButtonRight = 20,
    SpecialButtonLeft = 21,
    SpecialButtonRight = 22,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum GamepadInputTypeKind {
    Unspecified = 0,
    Button = 1,
    Axis = 2,
}

// ============================================
// DEVICE SCANNING
// ============================================

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcScannerRequest {
    #[prost(int64, tag = "1")]
    pub scanner: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcDeviceListResponse {
    #[prost(message, repeated, tag = "1")]
    pub devices: Vec<ScanDevice>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ScanDevice {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(enumeration = "DeviceProductKind", tag = "3")]
    pub product_id: i32,
    #[prost(bool, tag = "4")]
    pub is_in_green_mode: bool,
    #[prost(bool, tag = "5")]
    pub is_charging: bool,
    #[prost(bool, tag = "6")]
    pub is_drop_frame: bool,
    #[prost(int64, tag = "7")]
    pub battery_level: i64,
    #[prost(double, tag = "8")]
    pub frame_rate: f64,
    #[prost(int64, tag = "9")]
    pub icon_index: i64,
    #[prost(int64, tag = "10")]
    pub signal_strength: i64,
    #[prost(double, tag = "11")]
    pub last_seen_timestamp: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DeviceProductKind {
    Unspecified = 0,
    SyncE = 1,
    TrackE = 2,
    Generic = 3,
}

// ============================================
// EVENTS
// ============================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcEvent {
    #[prost(
        oneof = "ipc_event::Event",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13"
    )]
    pub event: Option<ipc_event::Event>,
}

pub mod ipc_event {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        PeerConnectionState(super::IpcPeerConnectionStateEvent),
        #[prost(message, tag = "2")]
        IceCandidate(super::IpcIceCandidateEvent),
        #[prost(message, tag = "3")]
        DataChannel(super::IpcDataChannelEvent),
        #[prost(message, tag = "4")]
        Track(super::IpcTrackEvent),
        #[prost(message, tag = "5")]
        DataChannelState(super::IpcDataChannelStateEvent),
        #[prost(message, tag = "6")]
        DataChannelMessage(super::IpcDataChannelMessageEvent),
        #[prost(message, tag = "7")]
        VideoFrameSize(super::IpcVideoFrameSizeEvent),
        #[prost(message, tag = "8")]
        ArTrackingState(super::IpcArTrackingStateEvent),
        #[prost(message, tag = "9")]
        ArFrame(super::IpcArFrameEvent),
        #[prost(message, tag = "10")]
        GamepadConnected(super::IpcGamepadEvent),
        #[prost(message, tag = "11")]
        GamepadDisconnected(super::IpcGamepadEvent),
        #[prost(message, tag = "12")]
        GamepadInput(super::IpcGamepadInputEvent),
        #[prost(message, tag = "13")]
        DevicesUpdated(super::IpcDevicesUpdatedEvent),
    }
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcPeerConnectionStateEvent {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(enumeration = "RtcPeerConnectionState", tag = "2")]
    pub state: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcIceCandidateEvent {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(message, optional, tag = "2")]
    pub candidate: Option<RtcIceCandidate>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcDataChannelEvent {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(int64, tag = "2")]
    pub data_channel: i64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcTrackEvent {
    #[prost(int64, tag = "1")]
    pub connection: i64,
    #[prost(int64, tag = "2")]
    pub track: i64,
    #[prost(enumeration = "RtcMediaKind", tag = "3")]
    pub kind: i32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcDataChannelStateEvent {
    #[prost(int64, tag = "1")]
    pub data_channel: i64,
    #[prost(enumeration = "RtcDataChannelState", tag = "2")]
    pub state: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcDataChannelMessageEvent {
    #[prost(int64, tag = "1")]
    pub data_channel: i64,
    #[prost(message, optional, tag = "2")]
    pub buffer: Option<RtcDataBuffer>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcVideoFrameSizeEvent {
    #[prost(int64, tag = "1")]
    pub controller: i64,
    #[prost(int64, tag = "2")]
    pub width: i64,
    #[prost(int64, tag = "3")]
    pub height: i64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcArTrackingStateEvent {
    #[prost(int64, tag = "1")]
    pub session: i64,
    #[prost(enumeration = "ArTrackingStateKind", tag = "2")]
    pub state: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcArFrameEvent {
    #[prost(int64, tag = "1")]
    pub session: i64,
    /// 16 little-endian `f32`s, column-major.
    #[prost(bytes = "vec", tag = "2")]
    pub camera_transform: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcGamepadEvent {
    #[prost(int64, tag = "1")]
    pub gamepad: i64,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct IpcGamepadInputEvent {
    #[prost(int64, tag = "1")]
    pub gamepad: i64,
    #[prost(enumeration = "GamepadInputKind", tag = "2")]
    pub input: i32,
    #[prost(enumeration = "GamepadInputTypeKind", tag = "3")]
    pub input_type: i32,
    #[prost(double, tag = "4")]
    pub value: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpcDevicesUpdatedEvent {
    #[prost(int64, tag = "1")]
    pub scanner: i64,
    #[prost(message, repeated, tag = "2")]
    pub devices: Vec<ScanDevice>,
}
