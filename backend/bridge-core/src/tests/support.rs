// Shared fixtures for unit tests: every subsystem wired to the loopback
// backend exactly like BridgeHost wires it, with events captured on an mpsc
// channel instead of broadcast.

use crate::ar::ArSessionApi;
use crate::device_scan::DeviceScanApi;
use crate::dispatch::EventDispatcher;
use crate::gamepad::GamepadApi;
use crate::host::Subsystems;
use crate::native::loopback::Loopback;
use crate::native::{ArRunConfig, NativeBackend};
use crate::rtc::{DataChannelApi, PeerConnectionApi, RtcSettings, VideoViewApi};

use models::BridgeEvent;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

pub(crate) const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) struct Fixture {
    pub hooks: Loopback,
    pub dispatchers: Vec<EventDispatcher<BridgeEvent>>,
    pub rx: mpsc::UnboundedReceiver<BridgeEvent>,
    pub data_channels: Arc<DataChannelApi>,
    pub peer_connections: Arc<PeerConnectionApi>,
    pub video_views: Arc<VideoViewApi>,
    pub ar_sessions: Arc<ArSessionApi>,
    pub gamepads: Arc<GamepadApi>,
    pub device_scan: Arc<DeviceScanApi>,
}

impl Fixture {
    /// Must be called inside a Tokio runtime.
    pub(crate) fn new() -> Self {
        Self::with_settings(RtcSettings::default())
    }

    pub(crate) fn with_settings(settings: RtcSettings) -> Self {
        let hooks = Loopback::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut dispatchers = Vec::new();
        let Subsystems {
            data_channels,
            peer_connections,
            video_views,
            ar_sessions,
            gamepads,
            device_scan,
        } = Subsystems::wire(
            NativeBackend::from(&hooks),
            settings,
            ArRunConfig::default(),
            |name| {
                let dispatcher = EventDispatcher::spawn(name, tx.clone());
                dispatchers.push(dispatcher.clone());
                dispatcher
            },
        );

        Self {
            hooks,
            dispatchers,
            rx,
            data_channels,
            peer_connections,
            video_views,
            ar_sessions,
            gamepads,
            device_scan,
        }
    }

    /// Wait until every producer queued so far on any dispatcher has run,
    /// then return the events they produced.
    pub(crate) async fn settle(&mut self) -> Vec<BridgeEvent> {
        for dispatcher in &self.dispatchers {
            flush(dispatcher).await;
        }
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Resolve once the dispatcher has drained its queue up to this point.
pub(crate) async fn flush(events: &EventDispatcher<BridgeEvent>) {
    let (tx, rx) = oneshot::channel();
    events.send(move || {
        let _ = tx.send(());
        None
    });
    tokio::time::timeout(EVENT_TIMEOUT, rx)
        .await
        .expect("Timed out flushing dispatcher")
        .expect("Dispatcher stopped");
}
