//! Composition root.
//!
//! [`BridgeHost`] builds every subsystem exactly once and fans their event
//! dispatchers into a single broadcast channel the IPC connections subscribe
//! to. Peer connections and their data channels share one dispatcher: a
//! channel's events name the handle its `DataChannel` announcement introduces,
//! so both must leave in emission order.

use crate::ar::ArSessionApi;
use crate::config::BridgeConfig;
use crate::device_scan::DeviceScanApi;
use crate::dispatch::EventDispatcher;
use crate::gamepad::GamepadApi;
use crate::native::{ArRunConfig, NativeBackend};
use crate::rtc::{DataChannelApi, PeerConnectionApi, RtcSettings, VideoViewApi};

use models::BridgeEvent;

use std::sync::Arc;

use log::info;
use tokio::sync::broadcast;

/// Every subsystem, wired to its dispatcher.
pub(crate) struct Subsystems {
    pub data_channels: Arc<DataChannelApi>,
    pub peer_connections: Arc<PeerConnectionApi>,
    pub video_views: Arc<VideoViewApi>,
    pub ar_sessions: Arc<ArSessionApi>,
    pub gamepads: Arc<GamepadApi>,
    pub device_scan: Arc<DeviceScanApi>,
}

impl Subsystems {
    /// Build every subsystem on `backend`. `spawn_dispatcher` is called once
    /// per event ordering domain. Gamepad monitoring is not started.
    pub(crate) fn wire(
        backend: NativeBackend,
        settings: RtcSettings,
        ar_config: ArRunConfig,
        mut spawn_dispatcher: impl FnMut(&'static str) -> EventDispatcher<BridgeEvent>,
    ) -> Self {
        let rtc_events = spawn_dispatcher("rtc");

        let data_channels = DataChannelApi::new(rtc_events.clone());
        let peer_connections =
            PeerConnectionApi::new(backend.rtc, settings, data_channels.clone(), rtc_events);
        let video_views =
            VideoViewApi::new(peer_connections.clone(), spawn_dispatcher("video_view"));
        let ar_sessions = ArSessionApi::new(backend.ar, ar_config, spawn_dispatcher("ar"));
        let gamepads = GamepadApi::new(backend.gamepad, spawn_dispatcher("gamepad"));
        let device_scan = DeviceScanApi::new(backend.device_scan, spawn_dispatcher("device_scan"));

        Self {
            data_channels,
            peer_connections,
            video_views,
            ar_sessions,
            gamepads,
            device_scan,
        }
    }
}

pub struct BridgeHost {
    events: broadcast::Sender<BridgeEvent>,
    data_channels: Arc<DataChannelApi>,
    peer_connections: Arc<PeerConnectionApi>,
    video_views: Arc<VideoViewApi>,
    ar_sessions: Arc<ArSessionApi>,
    gamepads: Arc<GamepadApi>,
    device_scan: Arc<DeviceScanApi>,
}

impl BridgeHost {
    /// Build every subsystem and start gamepad monitoring.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(config: &BridgeConfig, backend: NativeBackend) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.ipc.event_buffer);
        let Subsystems {
            data_channels,
            peer_connections,
            video_views,
            ar_sessions,
            gamepads,
            device_scan,
        } = Subsystems::wire(
            backend,
            config.rtc.settings(),
            ArRunConfig::default(),
            |name| EventDispatcher::spawn(name, events.clone()),
        );

        gamepads.start();
        info!("Bridge host ready");

        Arc::new(Self {
            events,
            data_channels,
            peer_connections,
            video_views,
            ar_sessions,
            gamepads,
            device_scan,
        })
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn data_channels(&self) -> &Arc<DataChannelApi> {
        &self.data_channels
    }

    pub fn peer_connections(&self) -> &Arc<PeerConnectionApi> {
        &self.peer_connections
    }

    pub fn video_views(&self) -> &Arc<VideoViewApi> {
        &self.video_views
    }

    pub fn ar_sessions(&self) -> &Arc<ArSessionApi> {
        &self.ar_sessions
    }

    pub fn gamepads(&self) -> &Arc<GamepadApi> {
        &self.gamepads
    }

    pub fn device_scan(&self) -> &Arc<DeviceScanApi> {
        &self.device_scan
    }

    /// Dispose everything the remote client created. Gamepads stay tracked.
    ///
    /// Order: views, peer connections (with their tracks and channels),
    /// leftover channels, AR sessions, scanners.
    pub fn dispose_client_resources(&self) {
        self.video_views.dispose_all();
        self.peer_connections.dispose_all();
        self.data_channels.dispose_all();
        self.ar_sessions.dispose_all();
        self.device_scan.dispose_all();
    }

    /// Shutdown: dispose every resource of every subsystem.
    pub fn dispose_all(&self) {
        self.dispose_client_resources();
        self.gamepads.dispose_all();
        info!("Bridge host disposed");
    }
}
