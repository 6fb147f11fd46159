use crate::ar::session::ArSession;
use crate::dispatch::EventDispatcher;
use crate::native::{ArBackend, ArRunConfig};
use crate::registry::Registry;

use models::ar::ArAvailability;
use models::{BridgeEvent, Handle};

use std::sync::{Arc, Weak};

use log::info;

pub struct ArSessionApi {
    this: Weak<ArSessionApi>,
    sessions: Registry<ArSession>,
    backend: Arc<dyn ArBackend>,
    run_config: ArRunConfig,
    events: EventDispatcher<BridgeEvent>,
}

impl ArSessionApi {
    pub fn new(
        backend: Arc<dyn ArBackend>,
        run_config: ArRunConfig,
        events: EventDispatcher<BridgeEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            sessions: Registry::new("AR session"),
            backend,
            run_config,
            events,
        })
    }

    pub(crate) fn events(&self) -> &EventDispatcher<BridgeEvent> {
        &self.events
    }

    /// Whether this host can track at all.
    pub fn initialize(&self) -> ArAvailability {
        let availability = if self.backend.is_supported() {
            ArAvailability::Available
        } else {
            ArAvailability::NotSupported
        };
        info!("World tracking availability: {:?}", availability);
        availability
    }

    pub fn create(&self) -> Handle {
        self.sessions
            .register(ArSession::new(self.this.clone(), self.backend.clone()))
    }

    pub fn run(&self, session: Handle) {
        self.sessions.get_checked(session).run(&self.run_config);
    }

    pub fn pause(&self, session: Handle) {
        self.sessions.get_checked(session).pause();
    }

    pub fn get(&self, session: Handle) -> Option<Arc<ArSession>> {
        self.sessions.get(session)
    }

    pub fn dispose(&self, session: Handle) {
        self.sessions.unregister(session);
    }

    pub fn dispose_all(&self) {
        self.sessions.dispose_all();
    }
}
