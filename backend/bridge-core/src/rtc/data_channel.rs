use crate::error::native::NativeError;
use crate::native::{DataChannelObserver, NativeDataChannel};
use crate::registry::{Lifecycle, ManagedResource};
use crate::rtc::data_channel_api::DataChannelApi;

use common::ErrorLocation;
use models::rtc::{DataBuffer, DataChannelState};
use models::{BridgeEvent, Handle};

use std::panic::Location;
use std::sync::{Arc, Weak};

use log::{debug, warn};
use parking_lot::Mutex;

/// One SCTP data channel.
///
/// `parent` is the handle of the peer connection the channel belongs to. It is
/// only a routing key for the remote client, never an owning reference.
pub struct DataChannel {
    lifecycle: Lifecycle,
    this: Weak<DataChannel>,
    api: Weak<DataChannelApi>,
    parent: Handle,
    label: String,
    native: Arc<dyn NativeDataChannel>,
    state: Mutex<DataChannelState>,
}

impl DataChannel {
    pub(crate) fn new(
        api: Weak<DataChannelApi>,
        native: Arc<dyn NativeDataChannel>,
        parent: Handle,
    ) -> Arc<Self> {
        let label = native.label();
        let state = native.ready_state();
        Arc::new_cyclic(|this| Self {
            lifecycle: Lifecycle::new(),
            this: this.clone(),
            api,
            parent,
            label,
            native,
            state: Mutex::new(state),
        })
    }

    pub fn parent(&self) -> Handle {
        self.parent
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> DataChannelState {
        *self.state.lock()
    }

    /// Fire-and-forget: a refused send is only logged.
    pub fn send(&self, buffer: &DataBuffer) {
        if !self.native.send(buffer) {
            warn!(
                "Data channel #{} ('{}') dropped a {} byte message in state {:?}",
                self.handle(),
                self.label,
                buffer.data.len(),
                self.native.ready_state()
            );
        }
    }

    fn on_state_change(&self, state: DataChannelState) {
        *self.state.lock() = state;
        let Some(api) = self.api.upgrade() else {
            return;
        };
        let handle = self.handle();
        api.events().emit(BridgeEvent::DataChannelStateChanged {
            data_channel: handle,
            state,
        });
        if state == DataChannelState::Closed {
            debug!("Data channel #{} closed natively", handle);
            api.unregister(handle);
        }
    }

    fn on_message(&self, buffer: DataBuffer) {
        if let Some(api) = self.api.upgrade() {
            api.events().emit(BridgeEvent::DataChannelMessage {
                data_channel: self.handle(),
                buffer,
            });
        }
    }
}

impl ManagedResource for DataChannel {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_registered(&self, _handle: Handle) -> Result<(), NativeError> {
        self.native.set_observer(Some(Arc::new(ChannelObserver {
            channel: self.this.clone(),
        })));
        // A channel that closed before the observer was attached would never
        // report it.
        if self.native.ready_state() == DataChannelState::Closed {
            self.native.set_observer(None);
            return Err(NativeError::Operation {
                message: format!("Data channel '{}' is already closed", self.label),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    fn dispose(&self) {
        self.native.set_observer(None);
        if self.native.ready_state() != DataChannelState::Closed {
            self.native.close();
        }
    }
}

struct ChannelObserver {
    channel: Weak<DataChannel>,
}

impl ChannelObserver {
    fn live(&self) -> Option<Arc<DataChannel>> {
        self.channel.upgrade().filter(|channel| !channel.is_disposed())
    }
}

impl DataChannelObserver for ChannelObserver {
    fn on_state_change(&self, state: DataChannelState) {
        if let Some(channel) = self.live() {
            channel.on_state_change(state);
        }
    }

    fn on_message(&self, buffer: DataBuffer) {
        if let Some(channel) = self.live() {
            channel.on_message(buffer);
        }
    }
}
