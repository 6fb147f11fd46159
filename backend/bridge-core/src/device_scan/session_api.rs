use crate::device_scan::session::ScanSession;
use crate::dispatch::EventDispatcher;
use crate::native::DeviceScanBackend;
use crate::registry::Registry;

use models::device::DeviceInfo;
use models::{BridgeEvent, Handle};

use std::sync::{Arc, Weak};

pub struct DeviceScanApi {
    this: Weak<DeviceScanApi>,
    sessions: Registry<ScanSession>,
    backend: Arc<dyn DeviceScanBackend>,
    events: EventDispatcher<BridgeEvent>,
}

impl DeviceScanApi {
    pub fn new(
        backend: Arc<dyn DeviceScanBackend>,
        events: EventDispatcher<BridgeEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            sessions: Registry::new("scan session"),
            backend,
            events,
        })
    }

    pub(crate) fn events(&self) -> &EventDispatcher<BridgeEvent> {
        &self.events
    }

    pub fn create(&self) -> Handle {
        self.sessions
            .register(ScanSession::new(self.this.clone(), self.backend.clone()))
    }

    pub fn start_scanning(&self, scanner: Handle) {
        self.sessions.get_checked(scanner).start_scanning();
    }

    pub fn stop_scanning(&self, scanner: Handle) {
        self.sessions.get_checked(scanner).stop_scanning();
    }

    pub fn cached_devices(&self, scanner: Handle) -> Vec<DeviceInfo> {
        self.sessions.get_checked(scanner).cached_devices()
    }

    pub fn get(&self, scanner: Handle) -> Option<Arc<ScanSession>> {
        self.sessions.get(scanner)
    }

    pub fn dispose(&self, scanner: Handle) {
        self.sessions.unregister(scanner);
    }

    pub fn dispose_all(&self) {
        self.sessions.dispose_all();
    }
}
