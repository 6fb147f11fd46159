use crate::dispatch::EventDispatcher;
use crate::native::NativeDataChannel;
use crate::registry::Registry;
use crate::rtc::data_channel::DataChannel;
use crate::rtc::peer_connection_api::PeerConnectionApi;

use models::rtc::{DataBuffer, DataChannelState};
use models::{BridgeEvent, Handle, INVALID_HANDLE};

use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::Mutex;

/// Remote-facing commands for data channels. Channels are registered by
/// their peer connection, never created directly by the client.
pub struct DataChannelApi {
    this: Weak<DataChannelApi>,
    channels: Registry<DataChannel>,
    peer_connections: Mutex<Weak<PeerConnectionApi>>,
    events: EventDispatcher<BridgeEvent>,
}

impl DataChannelApi {
    pub fn new(events: EventDispatcher<BridgeEvent>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            channels: Registry::new("data channel"),
            peer_connections: Mutex::new(Weak::new()),
            events,
        })
    }

    /// Where parent connections are looked up when a channel goes away.
    pub(crate) fn attach_peer_connections(&self, peer_connections: Weak<PeerConnectionApi>) {
        *self.peer_connections.lock() = peer_connections;
    }

    pub(crate) fn events(&self) -> &EventDispatcher<BridgeEvent> {
        &self.events
    }

    /// Register `native` as a child of `parent`. Returns [`INVALID_HANDLE`]
    /// when the channel is closed by the time it is addressable.
    pub(crate) fn register(&self, native: Arc<dyn NativeDataChannel>, parent: Handle) -> Handle {
        let channel = DataChannel::new(self.this.clone(), native.clone(), parent);
        let handle = self.channels.register(channel);
        if handle == INVALID_HANDLE {
            return INVALID_HANDLE;
        }
        // A Closed reported while registering found no entry to remove
        if native.ready_state() == DataChannelState::Closed {
            debug!("Data channel #{} closed during registration", handle);
            self.channels.unregister(handle);
            return INVALID_HANDLE;
        }
        handle
    }

    /// Dispose `data_channel` and drop it from its parent's channel list.
    pub(crate) fn unregister(&self, data_channel: Handle) -> Option<Arc<DataChannel>> {
        let channel = self.channels.unregister(data_channel)?;
        let peer_connections = self.peer_connections.lock().upgrade();
        if let Some(parent) = peer_connections.and_then(|api| api.get(channel.parent())) {
            parent.forget_data_channel(data_channel);
        }
        Some(channel)
    }

    pub(crate) fn contains(&self, data_channel: Handle) -> bool {
        self.channels.contains(data_channel)
    }

    pub fn get(&self, data_channel: Handle) -> Option<Arc<DataChannel>> {
        self.channels.get(data_channel)
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.channels.handles()
    }

    pub fn send(&self, data_channel: Handle, buffer: &DataBuffer) {
        self.channels.get_checked(data_channel).send(buffer);
    }

    pub fn dispose(&self, data_channel: Handle) {
        self.unregister(data_channel);
    }

    pub fn dispose_all(&self) {
        self.channels.dispose_all();
    }
}
