use crate::error::bridge::BridgeError;
use crate::error::native::NativeError;
use crate::native::{
    MediaConstraints, NativeDataChannel, NativeMediaTrack, NativePeerConnection,
    PeerConnectionConfig, PeerConnectionFactory, PeerConnectionObserver, await_completion,
};
use crate::registry::{Lifecycle, ManagedResource};
use crate::rtc::peer_connection_api::PeerConnectionApi;

use common::ErrorLocation;
use models::rtc::{
    DataChannelInit, IceCandidate, MediaKind, PeerConnectionState, SessionDescription,
    StatsReport,
};
use models::{BridgeEvent, Handle, INVALID_HANDLE};

use std::panic::Location;
use std::sync::{Arc, Weak};

use log::{debug, error, warn};
use parking_lot::Mutex;

/// One native peer connection and the tracks and data channels it produced.
///
/// The native connection is created in the ready step, so a handle is only
/// ever issued for a connection that exists. Tracks and data channels live in
/// their own registries; the connection only keeps their handles and releases
/// them when it is disposed.
pub struct PeerConnection {
    lifecycle: Lifecycle,
    this: Weak<PeerConnection>,
    api: Weak<PeerConnectionApi>,
    factory: Arc<dyn PeerConnectionFactory>,
    config: PeerConnectionConfig,
    constraints: MediaConstraints,
    native: Mutex<Option<Arc<dyn NativePeerConnection>>>,
    state: Mutex<PeerConnectionState>,
    tracks: Mutex<Vec<Handle>>,
    data_channels: Mutex<Vec<Handle>>,
}

impl PeerConnection {
    pub(crate) fn new(
        api: Weak<PeerConnectionApi>,
        factory: Arc<dyn PeerConnectionFactory>,
        config: PeerConnectionConfig,
        constraints: MediaConstraints,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            lifecycle: Lifecycle::new(),
            this: this.clone(),
            api,
            factory,
            config,
            constraints,
            native: Mutex::new(None),
            state: Mutex::new(PeerConnectionState::New),
            tracks: Mutex::new(Vec::new()),
            data_channels: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> PeerConnectionState {
        *self.state.lock()
    }

    pub fn track_handles(&self) -> Vec<Handle> {
        self.tracks.lock().clone()
    }

    pub fn data_channel_handles(&self) -> Vec<Handle> {
        self.data_channels.lock().clone()
    }

    #[track_caller]
    fn disposed_error(&self) -> BridgeError {
        BridgeError::Disposed {
            message: format!("Peer connection #{} has been disposed", self.handle()),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn native(&self) -> Result<Arc<dyn NativePeerConnection>, BridgeError> {
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        self.native.lock().clone().ok_or_else(|| self.disposed_error())
    }

    /// A completion that lands after disposal must not be reported as success.
    fn settle<T>(&self, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        if self.is_disposed() {
            debug!(
                "Peer connection #{} disposed before its operation completed",
                self.handle()
            );
            return Err(self.disposed_error());
        }
        result
    }

    pub async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BridgeError> {
        let native = self.native()?;
        let result = await_completion("set_remote_description", |done| {
            native.set_remote_description(description, done)
        })
        .await;
        self.settle(result)
    }

    pub async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), BridgeError> {
        let native = self.native()?;
        let result = await_completion("set_local_description", |done| {
            native.set_local_description(description, done)
        })
        .await;
        self.settle(result)
    }

    pub async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), BridgeError> {
        let native = self.native()?;
        let result = await_completion("add_ice_candidate", |done| {
            native.add_ice_candidate(candidate, done)
        })
        .await;
        self.settle(result)
    }

    pub async fn create_answer(&self) -> Result<SessionDescription, BridgeError> {
        let native = self.native()?;
        let constraints = self.constraints;
        let result = await_completion("create_answer", |done| {
            native.create_answer(constraints, done)
        })
        .await;
        self.settle(result)
    }

    pub async fn create_offer(&self) -> Result<SessionDescription, BridgeError> {
        let native = self.native()?;
        let constraints = self.constraints;
        let result = await_completion("create_offer", |done| {
            native.create_offer(constraints, done)
        })
        .await;
        self.settle(result)
    }

    /// Gather statistics, keeping only entries whose type is in `type_filter`
    /// when one is given.
    pub async fn get_stats(
        &self,
        type_filter: Option<Vec<String>>,
    ) -> Result<StatsReport, BridgeError> {
        let native = self.native()?;
        let result = await_completion("get_stats", |done| native.get_stats(done)).await;
        self.settle(result)
            .map(|report| report.retain_types(type_filter.as_deref()))
    }

    /// Open a data channel on this connection and register it.
    pub fn create_data_channel(
        &self,
        label: &str,
        init: &DataChannelInit,
    ) -> Result<Handle, BridgeError> {
        let native = self.native()?;
        let channel = native.create_data_channel(label, init)?;
        let api = self.api.upgrade().ok_or_else(|| self.disposed_error())?;
        let handle = api.data_channels().register(channel, self.handle());
        if handle != INVALID_HANDLE && self.adopt_data_channel(&api, handle) {
            return Ok(handle);
        }
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        Err(BridgeError::from(NativeError::Operation {
            message: format!("Data channel '{label}' closed before it could be registered"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }

    /// Drop a channel that went away on its own.
    pub(crate) fn forget_data_channel(&self, data_channel: Handle) {
        self.data_channels.lock().retain(|h| *h != data_channel);
    }

    /// Record a registered channel. `false` when this connection was disposed
    /// or the channel closed before it was recorded.
    fn adopt_data_channel(&self, api: &PeerConnectionApi, data_channel: Handle) -> bool {
        let adopted = self.adopt(&self.data_channels, data_channel, |h| {
            api.data_channels().unregister(h);
        });
        if adopted && !api.data_channels().contains(data_channel) {
            self.forget_data_channel(data_channel);
            return false;
        }
        adopted
    }

    /// Record a child handle, or release it right away when this connection
    /// was disposed concurrently. Disposal flips the flag before it drains
    /// the child lists, so checking under the list lock is enough.
    fn adopt(
        &self,
        children: &Mutex<Vec<Handle>>,
        handle: Handle,
        release: impl FnOnce(Handle),
    ) -> bool {
        let mut children = children.lock();
        if self.is_disposed() {
            drop(children);
            release(handle);
            return false;
        }
        children.push(handle);
        true
    }

    fn on_state_change(&self, state: PeerConnectionState) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        let Some(api) = self.api.upgrade() else {
            return;
        };
        debug!("Peer connection #{} is now {:?}", self.handle(), state);
        api.events().emit(BridgeEvent::PeerConnectionStateChanged {
            connection: self.handle(),
            state,
        });
    }

    fn on_ice_candidate(&self, candidate: IceCandidate) {
        if let Some(api) = self.api.upgrade() {
            api.events().emit(BridgeEvent::IceCandidate {
                connection: self.handle(),
                candidate,
            });
        }
    }

    fn on_track(&self, native: Arc<dyn NativeMediaTrack>) {
        let kind = match native.kind().parse::<MediaKind>() {
            Ok(kind) => kind,
            Err(e) => {
                error!("Peer connection #{}: ignoring track: {}", self.handle(), e);
                return;
            }
        };
        let Some(api) = self.api.upgrade() else {
            return;
        };

        let track = api.register_track(native, kind);
        if track == INVALID_HANDLE {
            return;
        }
        if !self.adopt(&self.tracks, track, |h| api.unregister_track(h)) {
            return;
        }
        api.events().emit(BridgeEvent::Track {
            connection: self.handle(),
            track,
            kind,
        });
    }

    fn on_data_channel(&self, native: Arc<dyn NativeDataChannel>) {
        let Some(api) = self.api.upgrade() else {
            return;
        };

        let label = native.label();
        let data_channel = api.data_channels().register(native, self.handle());
        if data_channel == INVALID_HANDLE {
            warn!(
                "Peer connection #{}: data channel '{}' closed before registration",
                self.handle(),
                label
            );
            return;
        }
        if self.adopt_data_channel(&api, data_channel) {
            api.events().emit(BridgeEvent::DataChannel {
                connection: self.handle(),
                data_channel,
            });
        }
    }
}

impl ManagedResource for PeerConnection {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_registered(&self, handle: Handle) -> Result<(), NativeError> {
        let observer = Arc::new(ConnectionObserver {
            connection: self.this.clone(),
        });
        let native = self.factory.create_peer_connection(&self.config, observer)?;
        *self.native.lock() = Some(native);
        debug!("Peer connection #{} created", handle);
        Ok(())
    }

    fn dispose(&self) {
        let api = self.api.upgrade();

        let tracks = std::mem::take(&mut *self.tracks.lock());
        let data_channels = std::mem::take(&mut *self.data_channels.lock());
        if let Some(api) = &api {
            for track in tracks {
                api.unregister_track(track);
            }
            for data_channel in data_channels {
                api.data_channels().unregister(data_channel);
            }
        }

        let native = self.native.lock().take();
        if let Some(native) = native
            && !self.state().is_closed()
        {
            native.close();
        }
    }
}

/// Native callbacks for one connection. Holds the connection weakly and goes
/// silent once it is disposed.
struct ConnectionObserver {
    connection: Weak<PeerConnection>,
}

impl ConnectionObserver {
    fn live(&self) -> Option<Arc<PeerConnection>> {
        self.connection
            .upgrade()
            .filter(|connection| !connection.is_disposed())
    }
}

impl PeerConnectionObserver for ConnectionObserver {
    fn on_connection_state_change(&self, state: PeerConnectionState) {
        if let Some(connection) = self.live() {
            connection.on_state_change(state);
        }
    }

    fn on_ice_candidate(&self, candidate: IceCandidate) {
        if let Some(connection) = self.live() {
            connection.on_ice_candidate(candidate);
        }
    }

    fn on_track(&self, track: Arc<dyn NativeMediaTrack>) {
        if let Some(connection) = self.live() {
            connection.on_track(track);
        }
    }

    fn on_data_channel(&self, channel: Arc<dyn NativeDataChannel>) {
        if let Some(connection) = self.live() {
            connection.on_data_channel(channel);
        }
    }
}
