use crate::device_scan::device_info;
use crate::device_scan::session_api::DeviceScanApi;
use crate::error::native::NativeError;
use crate::native::{AdapterState, DeviceScanBackend, DeviceScanObserver, NativeDeviceScanner};
use crate::registry::{Lifecycle, ManagedResource};

use models::device::DeviceInfo;
use models::{BridgeEvent, Handle};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info};
use parking_lot::Mutex;

/// One BLE scanner. `scanning` records what the client asked for, so a scan
/// interrupted by the adapter powering off resumes when it comes back.
pub struct ScanSession {
    lifecycle: Lifecycle,
    this: Weak<ScanSession>,
    api: Weak<DeviceScanApi>,
    backend: Arc<dyn DeviceScanBackend>,
    native: Mutex<Option<Arc<dyn NativeDeviceScanner>>>,
    scanning: AtomicBool,
}

impl ScanSession {
    pub(crate) fn new(
        api: Weak<DeviceScanApi>,
        backend: Arc<dyn DeviceScanBackend>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            lifecycle: Lifecycle::new(),
            this: this.clone(),
            api,
            backend,
            native: Mutex::new(None),
            scanning: AtomicBool::new(false),
        })
    }

    fn native(&self) -> Option<Arc<dyn NativeDeviceScanner>> {
        self.native.lock().clone()
    }

    pub fn wants_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub(crate) fn start_scanning(&self) {
        self.scanning.store(true, Ordering::SeqCst);
        if let Some(native) = self.native() {
            native.start_scanning();
        }
    }

    pub(crate) fn stop_scanning(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        if let Some(native) = self.native() {
            native.stop_scanning();
        }
    }

    pub fn cached_devices(&self) -> Vec<DeviceInfo> {
        self.native()
            .map(|native| native.cached_advertisements().iter().map(device_info).collect())
            .unwrap_or_default()
    }

    fn on_adapter_state_change(&self, state: AdapterState) {
        debug!("Scanner #{}: adapter is {:?}", self.handle(), state);
        if state == AdapterState::PoweredOn && self.wants_scanning() {
            info!("Scanner #{}: adapter powered on, resuming scan", self.handle());
            if let Some(native) = self.native() {
                native.start_scanning();
            }
        }
    }

    fn on_advertisements_updated(&self) {
        let Some(api) = self.api.upgrade() else {
            return;
        };
        let session = self.this.clone();
        // Cache is read at delivery time; a disposed session produces nothing.
        api.events().send(move || {
            let session = session.upgrade().filter(|s| !s.is_disposed())?;
            Some(BridgeEvent::DevicesUpdated {
                scanner: session.handle(),
                devices: session.cached_devices(),
            })
        });
    }
}

impl ManagedResource for ScanSession {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_registered(&self, _handle: Handle) -> Result<(), NativeError> {
        let observer = Arc::new(ScanObserver {
            session: self.this.clone(),
        });
        let native = self.backend.create_scanner(observer)?;
        *self.native.lock() = Some(native);
        Ok(())
    }

    fn dispose(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        let native = self.native.lock().take();
        if let Some(native) = native {
            native.stop_scanning();
            native.close();
        }
    }
}

struct ScanObserver {
    session: Weak<ScanSession>,
}

impl ScanObserver {
    fn live(&self) -> Option<Arc<ScanSession>> {
        self.session.upgrade().filter(|session| !session.is_disposed())
    }
}

impl DeviceScanObserver for ScanObserver {
    fn on_adapter_state_change(&self, state: AdapterState) {
        if let Some(session) = self.live() {
            session.on_adapter_state_change(state);
        }
    }

    fn on_advertisements_updated(&self) {
        if let Some(session) = self.live() {
            session.on_advertisements_updated();
        }
    }
}
