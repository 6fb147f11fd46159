use crate::dispatch::EventDispatcher;
use crate::error::bridge::BridgeError;
use crate::error::native::NativeError;
use crate::native::{NativeMediaTrack, PeerConnectionFactory, RtcBackend};
use crate::registry::Registry;
use crate::rtc::data_channel_api::DataChannelApi;
use crate::rtc::media_track::MediaTrack;
use crate::rtc::peer_connection::PeerConnection;
use crate::rtc::RtcSettings;

use models::rtc::{DataChannelInit, IceCandidate, MediaKind, SessionDescription, StatsReport};
use models::{BridgeEvent, Handle, INVALID_HANDLE};

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::{error, info};
use parking_lot::Mutex;

/// Remote-facing commands for peer connections.
///
/// Owns the peer connection and media track registries. The native factory
/// is built on first use and rebuilt after the field trials change.
pub struct PeerConnectionApi {
    this: Weak<PeerConnectionApi>,
    connections: Registry<PeerConnection>,
    tracks: Registry<MediaTrack>,
    data_channels: Arc<DataChannelApi>,
    backend: Arc<dyn RtcBackend>,
    settings: Mutex<RtcSettings>,
    factory: Mutex<Option<Arc<dyn PeerConnectionFactory>>>,
    events: EventDispatcher<BridgeEvent>,
}

impl PeerConnectionApi {
    pub fn new(
        backend: Arc<dyn RtcBackend>,
        settings: RtcSettings,
        data_channels: Arc<DataChannelApi>,
        events: EventDispatcher<BridgeEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| {
            data_channels.attach_peer_connections(this.clone());
            Self {
                this: this.clone(),
                connections: Registry::new("peer connection"),
                tracks: Registry::new("media track"),
                data_channels,
                backend,
                settings: Mutex::new(settings),
                factory: Mutex::new(None),
                events,
            }
        })
    }

    pub(crate) fn events(&self) -> &EventDispatcher<BridgeEvent> {
        &self.events
    }

    pub(crate) fn data_channels(&self) -> &Arc<DataChannelApi> {
        &self.data_channels
    }

    fn factory(&self) -> Result<Arc<dyn PeerConnectionFactory>, NativeError> {
        let mut factory = self.factory.lock();
        if let Some(existing) = factory.as_ref() {
            return Ok(existing.clone());
        }
        let field_trials = self.settings.lock().field_trials.clone();
        let built = self.backend.create_factory(&field_trials)?;
        info!(
            "Peer connection factory initialized with {} field trial(s)",
            field_trials.len()
        );
        *factory = Some(built.clone());
        Ok(built)
    }

    /// Replace the field trials. Takes effect for connections created
    /// afterwards.
    pub fn set_field_trials(&self, field_trials: HashMap<String, String>) {
        self.settings.lock().field_trials = field_trials;
        self.factory.lock().take();
    }

    /// Create a native peer connection. Returns [`INVALID_HANDLE`] when the
    /// native stack refuses.
    pub fn create(&self) -> Handle {
        let factory = match self.factory() {
            Ok(factory) => factory,
            Err(e) => {
                error!("Cannot create peer connection: {}", e);
                return INVALID_HANDLE;
            }
        };
        let (config, constraints) = {
            let settings = self.settings.lock();
            (settings.connection.clone(), settings.constraints)
        };
        let connection = PeerConnection::new(self.this.clone(), factory, config, constraints);
        self.connections.register(connection)
    }

    pub fn dispose(&self, connection: Handle) {
        self.connections.unregister(connection);
    }

    pub fn get(&self, connection: Handle) -> Option<Arc<PeerConnection>> {
        self.connections.get(connection)
    }

    pub fn connection_handles(&self) -> Vec<Handle> {
        self.connections.handles()
    }

    pub async fn set_remote_description(
        &self,
        connection: Handle,
        description: SessionDescription,
    ) -> Result<(), BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.set_remote_description(description).await
    }

    pub async fn set_local_description(
        &self,
        connection: Handle,
        description: SessionDescription,
    ) -> Result<(), BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.set_local_description(description).await
    }

    pub async fn add_remote_candidate(
        &self,
        connection: Handle,
        candidate: IceCandidate,
    ) -> Result<(), BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.add_remote_candidate(candidate).await
    }

    pub async fn create_answer(
        &self,
        connection: Handle,
    ) -> Result<SessionDescription, BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.create_answer().await
    }

    pub async fn create_offer(
        &self,
        connection: Handle,
    ) -> Result<SessionDescription, BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.create_offer().await
    }

    pub async fn get_stats(
        &self,
        connection: Handle,
        type_filter: Option<Vec<String>>,
    ) -> Result<StatsReport, BridgeError> {
        let connection = self.connections.get_checked(connection);
        connection.get_stats(type_filter).await
    }

    pub fn create_data_channel(
        &self,
        connection: Handle,
        label: &str,
        init: &DataChannelInit,
    ) -> Result<Handle, BridgeError> {
        self.connections
            .get_checked(connection)
            .create_data_channel(label, init)
    }

    pub(crate) fn register_track(
        &self,
        native: Arc<dyn NativeMediaTrack>,
        kind: MediaKind,
    ) -> Handle {
        self.tracks.register(Arc::new(MediaTrack::new(native, kind)))
    }

    pub(crate) fn unregister_track(&self, track: Handle) {
        self.tracks.unregister(track);
    }

    pub fn track(&self, track: Handle) -> Option<Arc<MediaTrack>> {
        self.tracks.get(track)
    }

    #[track_caller]
    pub fn track_checked(&self, track: Handle) -> Arc<MediaTrack> {
        self.tracks.get_checked(track)
    }

    pub fn track_handles(&self) -> Vec<Handle> {
        self.tracks.handles()
    }

    /// Dispose every connection (and with them their tracks and channels),
    /// then any orphaned track, and drop the cached factory.
    pub fn dispose_all(&self) {
        self.connections.dispose_all();
        self.tracks.dispose_all();
        self.factory.lock().take();
    }
}
