//! In-process backend.
//!
//! Peer connections answer offers with synthetic SDP and "connect" once both
//! descriptions are set; data channels echo what is sent on them. Every
//! native callback can also be fired by hand, which is how the unit and
//! integration tests drive the bridge.

use crate::error::native::NativeError;
use crate::native::{
    AdapterState, ArBackend, ArRunConfig, ArSessionObserver, Completion, ControlValue,
    DataChannelObserver, DeviceAdvertisement, DeviceScanBackend, DeviceScanObserver,
    GamepadBackend, GamepadObserver, MediaConstraints, NativeArFrame, NativeArSession,
    NativeControl, NativeDataChannel, NativeDeviceScanner, NativeMediaTrack, NativePeerConnection,
    NativeTrackingState, PeerConnectionConfig, PeerConnectionFactory, PeerConnectionObserver,
    PlayerIndex, RtcBackend, VideoFrameObserver,
};

use common::ErrorLocation;
use models::Handle;
use models::ar::CAMERA_TRANSFORM_LEN;
use models::rtc::{
    DataBuffer, DataChannelInit, DataChannelState, IceCandidate, PeerConnectionState, RtcStats,
    SessionDescription, SessionDescriptionType, StatsReport,
};

use std::collections::{BTreeSet, HashMap};
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use parking_lot::Mutex;

#[track_caller]
fn operation_error(message: impl Into<String>) -> NativeError {
    NativeError::Operation {
        message: message.into(),
        location: ErrorLocation::from(Location::caller()),
    }
}

fn now_micros() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as f64)
        .unwrap_or_default()
}

pub fn identity_transform() -> [f32; CAMERA_TRANSFORM_LEN] {
    let mut transform = [0.0; CAMERA_TRANSFORM_LEN];
    for i in 0..4 {
        transform[i * 4 + i] = 1.0;
    }
    transform
}

/// Handles to every part of the loopback backend.
#[derive(Clone)]
pub struct Loopback {
    pub rtc: Arc<LoopbackRtc>,
    pub ar: Arc<LoopbackAr>,
    pub gamepad: Arc<LoopbackGamepads>,
    pub device_scan: Arc<LoopbackDeviceScan>,
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            rtc: Arc::new(LoopbackRtc::default()),
            ar: Arc::new(LoopbackAr::default()),
            gamepad: Arc::new(LoopbackGamepads::default()),
            device_scan: Arc::new(LoopbackDeviceScan::default()),
        }
    }

    /// Make running AR sessions produce a frame every `interval`.
    pub fn with_ar_frame_interval(self, interval: Duration) -> Self {
        *self.ar.frame_interval.lock() = Some(interval);
        self
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// WEBRTC
// ============================================

#[derive(Default)]
struct RtcShared {
    fail_connections: AtomicBool,
    connections: Mutex<Vec<Arc<LoopbackPeerConnection>>>,
}

#[derive(Default)]
pub struct LoopbackRtc {
    fail_factory: AtomicBool,
    factories_built: AtomicUsize,
    last_field_trials: Mutex<HashMap<String, String>>,
    shared: Arc<RtcShared>,
}

impl LoopbackRtc {
    pub fn set_fail_factory(&self, fail: bool) {
        self.fail_factory.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_connections(&self, fail: bool) {
        self.shared.fail_connections.store(fail, Ordering::SeqCst);
    }

    pub fn factories_built(&self) -> usize {
        self.factories_built.load(Ordering::SeqCst)
    }

    pub fn last_field_trials(&self) -> HashMap<String, String> {
        self.last_field_trials.lock().clone()
    }

    pub fn connections(&self) -> Vec<Arc<LoopbackPeerConnection>> {
        self.shared.connections.lock().clone()
    }

    pub fn last_connection(&self) -> Option<Arc<LoopbackPeerConnection>> {
        self.shared.connections.lock().last().cloned()
    }
}

impl RtcBackend for LoopbackRtc {
    fn create_factory(
        &self,
        field_trials: &HashMap<String, String>,
    ) -> Result<Arc<dyn PeerConnectionFactory>, NativeError> {
        if self.fail_factory.load(Ordering::SeqCst) {
            return Err(operation_error("Peer connection factory initialization failed"));
        }
        self.factories_built.fetch_add(1, Ordering::SeqCst);
        *self.last_field_trials.lock() = field_trials.clone();
        Ok(Arc::new(LoopbackFactory {
            shared: self.shared.clone(),
        }))
    }
}

struct LoopbackFactory {
    shared: Arc<RtcShared>,
}

impl PeerConnectionFactory for LoopbackFactory {
    fn create_peer_connection(
        &self,
        config: &PeerConnectionConfig,
        observer: Arc<dyn PeerConnectionObserver>,
    ) -> Result<Arc<dyn NativePeerConnection>, NativeError> {
        if self.shared.fail_connections.load(Ordering::SeqCst) {
            return Err(operation_error("Native peer connection creation failed"));
        }
        let connection = Arc::new(LoopbackPeerConnection::new(config.clone(), observer));
        self.shared.connections.lock().push(connection.clone());
        Ok(connection)
    }
}

type HeldCompletion = Box<dyn FnOnce() + Send + 'static>;

pub struct LoopbackPeerConnection {
    config: PeerConnectionConfig,
    observer: Mutex<Option<Arc<dyn PeerConnectionObserver>>>,
    remote: Mutex<Option<SessionDescription>>,
    local: Mutex<Option<SessionDescription>>,
    state: Mutex<PeerConnectionState>,
    remote_candidates: Mutex<Vec<IceCandidate>>,
    channels: Mutex<Vec<Arc<LoopbackDataChannel>>>,
    hold_completions: AtomicBool,
    held: Mutex<Vec<HeldCompletion>>,
    close_calls: AtomicUsize,
}

impl LoopbackPeerConnection {
    fn new(config: PeerConnectionConfig, observer: Arc<dyn PeerConnectionObserver>) -> Self {
        Self {
            config,
            observer: Mutex::new(Some(observer)),
            remote: Mutex::new(None),
            local: Mutex::new(None),
            state: Mutex::new(PeerConnectionState::New),
            remote_candidates: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            hold_completions: AtomicBool::new(false),
            held: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        }
    }

    fn observer(&self) -> Option<Arc<dyn PeerConnectionObserver>> {
        self.observer.lock().clone()
    }

    fn complete<T: Send + 'static>(&self, done: Completion<T>, result: Result<T, NativeError>) {
        if self.hold_completions.load(Ordering::SeqCst) {
            self.held.lock().push(Box::new(move || done(result)));
        } else {
            done(result);
        }
    }

    fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    pub fn config(&self) -> &PeerConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> PeerConnectionState {
        *self.state.lock()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    pub fn remote_candidates(&self) -> Vec<IceCandidate> {
        self.remote_candidates.lock().clone()
    }

    pub fn data_channels(&self) -> Vec<Arc<LoopbackDataChannel>> {
        self.channels.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Park completions instead of invoking them, until
    /// [`release_completions`](Self::release_completions).
    pub fn hold_completions(&self, hold: bool) {
        self.hold_completions.store(hold, Ordering::SeqCst);
    }

    pub fn release_completions(&self) -> usize {
        let held: Vec<HeldCompletion> = std::mem::take(&mut *self.held.lock());
        let count = held.len();
        for complete in held {
            complete();
        }
        count
    }

    pub fn held_completions(&self) -> usize {
        self.held.lock().len()
    }

    /// Move to `state` and report it, the way the stack does on transport
    /// changes.
    pub fn emit_state(&self, state: PeerConnectionState) {
        *self.state.lock() = state;
        if state == PeerConnectionState::Connected {
            for channel in self.data_channels() {
                if channel.ready_state() == DataChannelState::Connecting {
                    channel.open();
                }
            }
        }
        if let Some(observer) = self.observer() {
            observer.on_connection_state_change(state);
        }
    }

    pub fn emit_ice_candidate(&self, candidate: IceCandidate) {
        if let Some(observer) = self.observer() {
            observer.on_ice_candidate(candidate);
        }
    }

    /// Simulate a remote track arriving.
    pub fn emit_track(&self, kind: &str) -> Arc<LoopbackMediaTrack> {
        let track = Arc::new(LoopbackMediaTrack::new(kind));
        if let Some(observer) = self.observer() {
            observer.on_track(track.clone());
        }
        track
    }

    /// Simulate the remote peer opening a data channel.
    pub fn emit_remote_data_channel(&self, label: &str) -> Arc<LoopbackDataChannel> {
        let channel = Arc::new(LoopbackDataChannel::new(label, DataChannelState::Open));
        self.channels.lock().push(channel.clone());
        if let Some(observer) = self.observer() {
            observer.on_data_channel(channel.clone());
        }
        channel
    }

    fn synthetic_sdp(&self, constraints: MediaConstraints) -> String {
        let mut sdp = String::from("v=0\r\no=vcam-loopback 0 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n");
        if constraints.offer_to_receive_audio {
            sdp.push_str("m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=recvonly\r\n");
        }
        if constraints.offer_to_receive_video {
            sdp.push_str("m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n");
        }
        sdp.push_str("m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n");
        sdp
    }

    fn maybe_connect(&self) {
        let ready = self.local.lock().is_some() && self.remote.lock().is_some();
        if !ready || self.state() != PeerConnectionState::New {
            return;
        }
        self.emit_ice_candidate(IceCandidate {
            candidate: String::from("candidate:1 1 udp 2122260223 127.0.0.1 9 typ host"),
            sdp_mid: String::from("0"),
            sdp_mline_index: 0,
        });
        self.emit_state(PeerConnectionState::Connecting);
        self.emit_state(PeerConnectionState::Connected);
    }
}

impl NativePeerConnection for LoopbackPeerConnection {
    fn set_remote_description(&self, description: SessionDescription, done: Completion<()>) {
        if self.is_closed() {
            return self.complete(done, Err(operation_error("Peer connection is closed")));
        }
        *self.remote.lock() = Some(description);
        self.maybe_connect();
        self.complete(done, Ok(()));
    }

    fn set_local_description(&self, description: SessionDescription, done: Completion<()>) {
        if self.is_closed() {
            return self.complete(done, Err(operation_error("Peer connection is closed")));
        }
        *self.local.lock() = Some(description);
        self.maybe_connect();
        self.complete(done, Ok(()));
    }

    fn add_ice_candidate(&self, candidate: IceCandidate, done: Completion<()>) {
        if self.remote.lock().is_none() {
            return self.complete(
                done,
                Err(operation_error("Cannot add a candidate before the remote description")),
            );
        }
        self.remote_candidates.lock().push(candidate);
        self.complete(done, Ok(()));
    }

    fn create_offer(&self, constraints: MediaConstraints, done: Completion<SessionDescription>) {
        let sdp = self.synthetic_sdp(constraints);
        self.complete(done, Ok(SessionDescription::new(SessionDescriptionType::Offer, sdp)));
    }

    fn create_answer(&self, constraints: MediaConstraints, done: Completion<SessionDescription>) {
        let has_offer = matches!(
            self.remote.lock().as_ref().map(|d| d.sdp_type),
            Some(SessionDescriptionType::Offer)
        );
        if !has_offer {
            return self.complete(
                done,
                Err(operation_error("Cannot create an answer without a remote offer")),
            );
        }
        let sdp = self.synthetic_sdp(constraints);
        self.complete(done, Ok(SessionDescription::new(SessionDescriptionType::Answer, sdp)));
    }

    fn get_stats(&self, done: Completion<StatsReport>) {
        let timestamp_us = now_micros();
        let mut report = StatsReport {
            timestamp_us,
            stats: HashMap::new(),
        };
        report.stats.insert(
            String::from("P"),
            RtcStats {
                timestamp_us,
                stats_type: String::from("peer-connection"),
                id: String::from("P"),
                values: HashMap::from([(
                    String::from("dataChannelsOpened"),
                    self.channels.lock().len().to_string(),
                )]),
            },
        );
        report.stats.insert(
            String::from("T01"),
            RtcStats {
                timestamp_us,
                stats_type: String::from("transport"),
                id: String::from("T01"),
                values: HashMap::from([(
                    String::from("dtlsState"),
                    format!("{:?}", self.state()).to_lowercase(),
                )]),
            },
        );
        self.complete(done, Ok(report));
    }

    fn create_data_channel(
        &self,
        label: &str,
        _init: &DataChannelInit,
    ) -> Result<Arc<dyn NativeDataChannel>, NativeError> {
        if self.is_closed() {
            return Err(operation_error("Peer connection is closed"));
        }
        let initial = if self.state() == PeerConnectionState::Connected {
            DataChannelState::Open
        } else {
            DataChannelState::Connecting
        };
        let channel = Arc::new(LoopbackDataChannel::new(label, initial));
        self.channels.lock().push(channel.clone());
        Ok(channel)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return;
        }
        for channel in self.data_channels() {
            channel.remote_close();
        }
        self.emit_state(PeerConnectionState::Closed);
        self.observer.lock().take();
    }
}

pub struct LoopbackDataChannel {
    label: String,
    state: Mutex<DataChannelState>,
    observer: Mutex<Option<Arc<dyn DataChannelObserver>>>,
    sent: Mutex<Vec<DataBuffer>>,
    echo: AtomicBool,
    detach_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl LoopbackDataChannel {
    fn new(label: &str, state: DataChannelState) -> Self {
        Self {
            label: label.to_string(),
            state: Mutex::new(state),
            observer: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            echo: AtomicBool::new(true),
            detach_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    fn transition(&self, state: DataChannelState) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_state_change(state);
        }
    }

    pub fn open(&self) {
        self.transition(DataChannelState::Open);
    }

    /// The remote side closed the channel.
    pub fn remote_close(&self) {
        self.transition(DataChannelState::Closing);
        self.transition(DataChannelState::Closed);
    }

    pub fn deliver(&self, buffer: DataBuffer) {
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_message(buffer);
        }
    }

    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<DataBuffer> {
        self.sent.lock().clone()
    }

    pub fn has_observer(&self) -> bool {
        self.observer.lock().is_some()
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl NativeDataChannel for LoopbackDataChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> DataChannelState {
        *self.state.lock()
    }

    fn set_observer(&self, observer: Option<Arc<dyn DataChannelObserver>>) {
        if observer.is_none() {
            self.detach_calls.fetch_add(1, Ordering::SeqCst);
        }
        *self.observer.lock() = observer;
    }

    fn send(&self, buffer: &DataBuffer) -> bool {
        if self.ready_state() != DataChannelState::Open {
            return false;
        }
        self.sent.lock().push(buffer.clone());
        if self.echo.load(Ordering::SeqCst) {
            self.deliver(buffer.clone());
        }
        true
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_close();
    }
}

pub struct LoopbackMediaTrack {
    id: String,
    kind: String,
    renderers: Mutex<HashMap<Handle, Arc<dyn VideoFrameObserver>>>,
}

impl LoopbackMediaTrack {
    pub fn new(kind: &str) -> Self {
        static NEXT_TRACK: AtomicUsize = AtomicUsize::new(0);
        Self {
            id: format!("loopback-{kind}-{}", NEXT_TRACK.fetch_add(1, Ordering::Relaxed)),
            kind: kind.to_string(),
            renderers: Mutex::new(HashMap::new()),
        }
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.lock().len()
    }

    pub fn emit_frame_size(&self, width: u32, height: u32) {
        let renderers: Vec<Arc<dyn VideoFrameObserver>> =
            self.renderers.lock().values().cloned().collect();
        for renderer in renderers {
            renderer.on_frame_size_changed(width, height);
        }
    }
}

impl NativeMediaTrack for LoopbackMediaTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> String {
        self.kind.clone()
    }

    fn attach_renderer(
        &self,
        key: Handle,
        observer: Arc<dyn VideoFrameObserver>,
    ) -> Result<(), NativeError> {
        if self.kind != "video" {
            return Err(operation_error(format!(
                "Cannot render a {} track",
                self.kind
            )));
        }
        self.renderers.lock().insert(key, observer);
        Ok(())
    }

    fn detach_renderer(&self, key: Handle) {
        self.renderers.lock().remove(&key);
    }
}

// ============================================
// AR
// ============================================

pub struct LoopbackAr {
    supported: AtomicBool,
    fail_sessions: AtomicBool,
    frame_interval: Mutex<Option<Duration>>,
    sessions: Mutex<Vec<Arc<LoopbackArSession>>>,
}

impl Default for LoopbackAr {
    fn default() -> Self {
        Self {
            supported: AtomicBool::new(true),
            fail_sessions: AtomicBool::new(false),
            frame_interval: Mutex::new(None),
            sessions: Mutex::new(Vec::new()),
        }
    }
}

impl LoopbackAr {
    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn set_fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::SeqCst);
    }

    pub fn last_session(&self) -> Option<Arc<LoopbackArSession>> {
        self.sessions.lock().last().cloned()
    }
}

impl ArBackend for LoopbackAr {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    fn create_session(
        &self,
        observer: Arc<dyn ArSessionObserver>,
    ) -> Result<Arc<dyn NativeArSession>, NativeError> {
        if !self.is_supported() || self.fail_sessions.load(Ordering::SeqCst) {
            return Err(operation_error("World tracking session could not be created"));
        }
        let interval = *self.frame_interval.lock();
        let session = Arc::new_cyclic(|weak| LoopbackArSession {
            weak: weak.clone(),
            observer: Mutex::new(Some(observer)),
            running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            run_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            frame_interval: interval,
            ticker_started: AtomicBool::new(false),
        });
        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

pub struct LoopbackArSession {
    weak: Weak<LoopbackArSession>,
    observer: Mutex<Option<Arc<dyn ArSessionObserver>>>,
    running: AtomicBool,
    closed: AtomicBool,
    run_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    last_config: Mutex<Option<ArRunConfig>>,
    frame_interval: Option<Duration>,
    ticker_started: AtomicBool,
}

impl LoopbackArSession {
    pub fn emit_tracking_state(&self, state: NativeTrackingState) {
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_tracking_state_change(state);
        }
    }

    pub fn emit_frame(&self, frame: NativeArFrame) {
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_frame(frame);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<ArRunConfig> {
        *self.last_config.lock()
    }

    fn start_ticker(&self, interval: Duration) {
        if self.ticker_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak = self.weak.clone();
        let spawned = thread::Builder::new()
            .name(String::from("loopback-ar"))
            .spawn(move || {
                let mut tick: u32 = 0;
                loop {
                    thread::sleep(interval);
                    let Some(session) = weak.upgrade() else {
                        break;
                    };
                    if session.is_closed() {
                        break;
                    }
                    if !session.is_running() {
                        continue;
                    }
                    let mut camera_transform = identity_transform();
                    // Slow drift along x so a client can see motion.
                    camera_transform[12] = (tick as f32 * 0.001).sin();
                    tick = tick.wrapping_add(1);
                    session.emit_frame(NativeArFrame {
                        tracking_state: NativeTrackingState::Normal,
                        camera_transform,
                    });
                }
                debug!("Loopback AR ticker stopped");
            });
        if let Err(e) = spawned {
            warn!("Failed to start loopback AR ticker: {}", e);
        }
    }
}

impl NativeArSession for LoopbackArSession {
    fn run(&self, config: &ArRunConfig) {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(*config);
        self.running.store(true, Ordering::SeqCst);
        if let Some(interval) = self.frame_interval {
            self.start_ticker(interval);
        }
    }

    fn pause(&self) {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.observer.lock().take();
    }
}

// ============================================
// GAMEPADS
// ============================================

#[derive(Default)]
pub struct LoopbackGamepads {
    observer: Mutex<Option<Arc<dyn GamepadObserver>>>,
    connected: Mutex<BTreeSet<PlayerIndex>>,
}

impl LoopbackGamepads {
    fn observer(&self) -> Option<Arc<dyn GamepadObserver>> {
        self.observer.lock().clone()
    }

    pub fn is_started(&self) -> bool {
        self.observer.lock().is_some()
    }

    pub fn connect(&self, player: PlayerIndex) {
        if !self.connected.lock().insert(player) {
            return;
        }
        if let Some(observer) = self.observer() {
            observer.on_connected(player);
        }
    }

    pub fn disconnect(&self, player: PlayerIndex) {
        if !self.connected.lock().remove(&player) {
            return;
        }
        if let Some(observer) = self.observer() {
            observer.on_disconnected(player);
        }
    }

    pub fn input(&self, player: PlayerIndex, control: NativeControl, value: ControlValue) {
        if let Some(observer) = self.observer() {
            observer.on_control_changed(player, control, value);
        }
    }
}

impl GamepadBackend for LoopbackGamepads {
    fn start(&self, observer: Arc<dyn GamepadObserver>) -> Vec<PlayerIndex> {
        *self.observer.lock() = Some(observer);
        self.connected.lock().iter().copied().collect()
    }

    fn stop(&self) {
        self.observer.lock().take();
    }
}

// ============================================
// BLE DEVICE SCANNING
// ============================================

#[derive(Default)]
pub struct LoopbackDeviceScan {
    fail: AtomicBool,
    scanners: Mutex<Vec<Arc<LoopbackScanner>>>,
}

impl LoopbackDeviceScan {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_scanner(&self) -> Option<Arc<LoopbackScanner>> {
        self.scanners.lock().last().cloned()
    }
}

impl DeviceScanBackend for LoopbackDeviceScan {
    fn create_scanner(
        &self,
        observer: Arc<dyn DeviceScanObserver>,
    ) -> Result<Arc<dyn NativeDeviceScanner>, NativeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(operation_error("Bluetooth central could not be created"));
        }
        let scanner = Arc::new(LoopbackScanner {
            observer: Mutex::new(Some(observer)),
            adapter: Mutex::new(AdapterState::PoweredOn),
            scanning: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            adverts: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.scanners.lock().push(scanner.clone());
        Ok(scanner)
    }
}

pub struct LoopbackScanner {
    observer: Mutex<Option<Arc<dyn DeviceScanObserver>>>,
    adapter: Mutex<AdapterState>,
    scanning: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    adverts: Mutex<Vec<DeviceAdvertisement>>,
    closed: AtomicBool,
}

impl LoopbackScanner {
    fn observer(&self) -> Option<Arc<dyn DeviceScanObserver>> {
        self.observer.lock().clone()
    }

    pub fn set_adapter_state(&self, state: AdapterState) {
        *self.adapter.lock() = state;
        if state != AdapterState::PoweredOn {
            self.scanning.store(false, Ordering::SeqCst);
        }
        if let Some(observer) = self.observer() {
            observer.on_adapter_state_change(state);
        }
    }

    /// Cache `advert`, replacing any earlier one from the same device.
    pub fn advertise(&self, advert: DeviceAdvertisement) {
        {
            let mut adverts = self.adverts.lock();
            match adverts.iter_mut().find(|a| a.identifier == advert.identifier) {
                Some(existing) => *existing = advert,
                None => adverts.push(advert),
            }
        }
        if let Some(observer) = self.observer() {
            observer.on_advertisements_updated();
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl NativeDeviceScanner for LoopbackScanner {
    fn adapter_state(&self) -> AdapterState {
        *self.adapter.lock()
    }

    fn start_scanning(&self) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.adapter_state() == AdapterState::PoweredOn {
            self.scanning.store(true, Ordering::SeqCst);
        }
    }

    fn stop_scanning(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.scanning.store(false, Ordering::SeqCst);
    }

    fn cached_advertisements(&self) -> Vec<DeviceAdvertisement> {
        self.adverts.lock().clone()
    }

    fn close(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.observer.lock().take();
    }
}
