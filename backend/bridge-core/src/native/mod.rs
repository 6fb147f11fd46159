//! Boundary with the platform SDKs.
//!
//! Every native capability the bridge drives is expressed as an object-safe
//! trait. Native code calls back through the observer traits on whatever
//! thread it likes; asynchronous operations report through a one-shot
//! [`Completion`].

pub mod loopback;
mod unavailable;

pub use unavailable::Unavailable;

use crate::error::bridge::BridgeError;
use crate::error::native::NativeError;

use common::ErrorLocation;
use models::ar::CAMERA_TRANSFORM_LEN;
use models::rtc::{
    DataBuffer, DataChannelInit, DataChannelState, IceCandidate, PeerConnectionState,
    SessionDescription, StatsReport,
};
use models::Handle;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use tokio::sync::oneshot;

/// Result callback of an asynchronous native operation. Invoked at most once,
/// from any thread.
pub type Completion<T> = Box<dyn FnOnce(Result<T, NativeError>) + Send + 'static>;

/// Start a native operation and wait for its completion.
pub(crate) async fn await_completion<T, F>(operation: &'static str, start: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |result| {
        let _ = tx.send(result);
    }));

    match rx.await {
        Ok(result) => result.map_err(BridgeError::from),
        Err(_) => Err(BridgeError::Abandoned {
            message: format!("Native layer dropped the completion of {operation}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

// ============================================
// PEER CONNECTIONS
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerConnectionConfig {
    pub ice_servers: Vec<String>,
    pub continual_gathering: bool,
}

/// Constraints applied when creating offers and answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
}

/// Builds peer connection factories. A factory is tied to the field trials it
/// was built with.
pub trait RtcBackend: Send + Sync {
    fn create_factory(
        &self,
        field_trials: &HashMap<String, String>,
    ) -> Result<Arc<dyn PeerConnectionFactory>, NativeError>;
}

pub trait PeerConnectionFactory: Send + Sync {
    fn create_peer_connection(
        &self,
        config: &PeerConnectionConfig,
        observer: Arc<dyn PeerConnectionObserver>,
    ) -> Result<Arc<dyn NativePeerConnection>, NativeError>;
}

pub trait NativePeerConnection: Send + Sync {
    fn set_remote_description(&self, description: SessionDescription, done: Completion<()>);
    fn set_local_description(&self, description: SessionDescription, done: Completion<()>);
    fn add_ice_candidate(&self, candidate: IceCandidate, done: Completion<()>);
    fn create_offer(&self, constraints: MediaConstraints, done: Completion<SessionDescription>);
    fn create_answer(&self, constraints: MediaConstraints, done: Completion<SessionDescription>);
    fn get_stats(&self, done: Completion<StatsReport>);
    fn create_data_channel(
        &self,
        label: &str,
        init: &DataChannelInit,
    ) -> Result<Arc<dyn NativeDataChannel>, NativeError>;
    fn close(&self);
}

pub trait PeerConnectionObserver: Send + Sync {
    fn on_connection_state_change(&self, state: PeerConnectionState);
    fn on_ice_candidate(&self, candidate: IceCandidate);
    fn on_track(&self, track: Arc<dyn NativeMediaTrack>);
    fn on_data_channel(&self, channel: Arc<dyn NativeDataChannel>);
}

// ============================================
// DATA CHANNELS
// ============================================

pub trait NativeDataChannel: Send + Sync {
    fn label(&self) -> String;
    fn ready_state(&self) -> DataChannelState;
    /// Replace the observer; `None` detaches.
    fn set_observer(&self, observer: Option<Arc<dyn DataChannelObserver>>);
    /// Queue `buffer` for sending. `false` when the stack refused it.
    fn send(&self, buffer: &DataBuffer) -> bool;
    fn close(&self);
}

pub trait DataChannelObserver: Send + Sync {
    fn on_state_change(&self, state: DataChannelState);
    fn on_message(&self, buffer: DataBuffer);
}

// ============================================
// MEDIA TRACKS
// ============================================

pub trait NativeMediaTrack: Send + Sync {
    fn id(&self) -> String;
    /// `"audio"` or `"video"`.
    fn kind(&self) -> String;
    /// Start rendering into a frame observer identified by `key`.
    fn attach_renderer(
        &self,
        key: Handle,
        observer: Arc<dyn VideoFrameObserver>,
    ) -> Result<(), NativeError>;
    fn detach_renderer(&self, key: Handle);
}

pub trait VideoFrameObserver: Send + Sync {
    fn on_frame_size_changed(&self, width: u32, height: u32);
}

// ============================================
// AR
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedReason {
    Initializing,
    Relocalizing,
    ExcessiveMotion,
    InsufficientFeatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTrackingState {
    NotAvailable,
    Limited(LimitedReason),
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeArFrame {
    pub tracking_state: NativeTrackingState,
    pub camera_transform: [f32; CAMERA_TRANSFORM_LEN],
}

/// World-tracking options used for every `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArRunConfig {
    pub gravity_aligned: bool,
    pub plane_detection: bool,
    pub light_estimation: bool,
    pub provides_audio: bool,
}

impl Default for ArRunConfig {
    fn default() -> Self {
        Self {
            gravity_aligned: true,
            plane_detection: false,
            light_estimation: false,
            provides_audio: false,
        }
    }
}

pub trait ArBackend: Send + Sync {
    fn is_supported(&self) -> bool;
    fn create_session(
        &self,
        observer: Arc<dyn ArSessionObserver>,
    ) -> Result<Arc<dyn NativeArSession>, NativeError>;
}

pub trait NativeArSession: Send + Sync {
    fn run(&self, config: &ArRunConfig);
    fn pause(&self);
    /// Stop and detach the observer.
    fn close(&self);
}

pub trait ArSessionObserver: Send + Sync {
    fn on_tracking_state_change(&self, state: NativeTrackingState);
    fn on_frame(&self, frame: NativeArFrame);
}

// ============================================
// GAMEPADS
// ============================================

/// Player slot the OS assigned to a controller.
pub type PlayerIndex = u32;

/// Controller elements as the platform names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeControl {
    ButtonA,
    ButtonB,
    ButtonX,
    ButtonY,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    LeftThumbstickButton,
    RightThumbstickButton,
    ButtonOptions,
    ButtonMenu,
    ButtonHome,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Dpad,
    LeftThumbstick,
    RightThumbstick,
    LeftThumbstickXAxis,
    LeftThumbstickYAxis,
    RightThumbstickXAxis,
    RightThumbstickYAxis,
}

/// Value reported with a control change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Button {
        pressed: bool,
        value: f32,
    },
    Axis(f32),
    Directional {
        x: f32,
        y: f32,
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    },
}

pub trait GamepadBackend: Send + Sync {
    /// Begin reporting connects, disconnects and input. Returns the players
    /// already connected.
    fn start(&self, observer: Arc<dyn GamepadObserver>) -> Vec<PlayerIndex>;
    fn stop(&self);
}

pub trait GamepadObserver: Send + Sync {
    fn on_connected(&self, player: PlayerIndex);
    fn on_disconnected(&self, player: PlayerIndex);
    fn on_control_changed(&self, player: PlayerIndex, control: NativeControl, value: ControlValue);
}

// ============================================
// BLE DEVICE SCANNING
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeProductId {
    SyncE,
    TrackE,
    Other(u16),
}

/// Latest advertisement cached for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceAdvertisement {
    pub identifier: String,
    pub name: String,
    pub product_id: NativeProductId,
    pub green_mode: bool,
    pub charging: bool,
    pub drop_frame: bool,
    pub battery_percent: u8,
    pub frame_rate: f64,
    pub icon: u8,
    pub rssi: i8,
    pub last_seen_secs: f64,
}

pub trait DeviceScanBackend: Send + Sync {
    fn create_scanner(
        &self,
        observer: Arc<dyn DeviceScanObserver>,
    ) -> Result<Arc<dyn NativeDeviceScanner>, NativeError>;
}

pub trait NativeDeviceScanner: Send + Sync {
    fn adapter_state(&self) -> AdapterState;
    fn start_scanning(&self);
    fn stop_scanning(&self);
    fn cached_advertisements(&self) -> Vec<DeviceAdvertisement>;
    fn close(&self);
}

pub trait DeviceScanObserver: Send + Sync {
    fn on_adapter_state_change(&self, state: AdapterState);
    fn on_advertisements_updated(&self);
}

// ============================================
// BACKEND BUNDLE
// ============================================

/// One implementation per SDK boundary, chosen at startup.
#[derive(Clone)]
pub struct NativeBackend {
    pub rtc: Arc<dyn RtcBackend>,
    pub ar: Arc<dyn ArBackend>,
    pub gamepad: Arc<dyn GamepadBackend>,
    pub device_scan: Arc<dyn DeviceScanBackend>,
}

impl NativeBackend {
    /// Backend for hosts without native SDKs: every construction fails.
    pub fn unavailable() -> Self {
        let backend = Arc::new(Unavailable);
        Self {
            rtc: backend.clone(),
            ar: backend.clone(),
            gamepad: backend.clone(),
            device_scan: backend,
        }
    }

    /// In-process simulation. Returns the hooks driving it alongside.
    pub fn loopback() -> (Self, loopback::Loopback) {
        let hooks = loopback::Loopback::new();
        (Self::from(&hooks), hooks)
    }
}

impl From<&loopback::Loopback> for NativeBackend {
    fn from(hooks: &loopback::Loopback) -> Self {
        Self {
            rtc: hooks.rtc.clone(),
            ar: hooks.ar.clone(),
            gamepad: hooks.gamepad.clone(),
            device_scan: hooks.device_scan.clone(),
        }
    }
}
