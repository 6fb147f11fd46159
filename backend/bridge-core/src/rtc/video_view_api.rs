use crate::dispatch::EventDispatcher;
use crate::error::bridge::BridgeError;
use crate::registry::Registry;
use crate::rtc::peer_connection_api::PeerConnectionApi;
use crate::rtc::video_view::VideoViewController;

use models::{BridgeEvent, Handle, optional_handle};

use std::sync::{Arc, Weak};

/// Remote-facing commands for video views. Tracks are looked up in the peer
/// connection subsystem's track registry.
pub struct VideoViewApi {
    this: Weak<VideoViewApi>,
    controllers: Registry<VideoViewController>,
    peer_connections: Arc<PeerConnectionApi>,
    events: EventDispatcher<BridgeEvent>,
}

impl VideoViewApi {
    pub fn new(
        peer_connections: Arc<PeerConnectionApi>,
        events: EventDispatcher<BridgeEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            controllers: Registry::new("video view"),
            peer_connections,
            events,
        })
    }

    pub(crate) fn events(&self) -> &EventDispatcher<BridgeEvent> {
        &self.events
    }

    pub fn create(&self) -> Handle {
        self.controllers
            .register(VideoViewController::new(self.this.clone()))
    }

    /// Attach the video track `track` to `controller`; [`INVALID_HANDLE`]
    /// detaches.
    ///
    /// [`INVALID_HANDLE`]: models::INVALID_HANDLE
    pub fn set_track(&self, controller: Handle, track: Handle) -> Result<(), BridgeError> {
        let controller = self.controllers.get_checked(controller);
        let track = optional_handle(track).map(|h| (h, self.peer_connections.track_checked(h)));
        controller.set_track(track)
    }

    pub fn get(&self, controller: Handle) -> Option<Arc<VideoViewController>> {
        self.controllers.get(controller)
    }

    pub fn dispose(&self, controller: Handle) {
        self.controllers.unregister(controller);
    }

    pub fn dispose_all(&self) {
        self.controllers.dispose_all();
    }
}
