use crate::error::native::NativeError;
use crate::native::{
    ArBackend, ArSessionObserver, DeviceScanBackend, DeviceScanObserver, GamepadBackend,
    GamepadObserver, NativeArSession, NativeDeviceScanner, PeerConnectionFactory, PlayerIndex,
    RtcBackend,
};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use log::debug;

/// Backend of a host with no native SDKs.
pub struct Unavailable;

#[track_caller]
fn unavailable(capability: &str) -> NativeError {
    NativeError::Unavailable {
        message: format!("{capability} is not available on this host"),
        location: ErrorLocation::from(Location::caller()),
    }
}

impl RtcBackend for Unavailable {
    fn create_factory(
        &self,
        _field_trials: &HashMap<String, String>,
    ) -> Result<Arc<dyn PeerConnectionFactory>, NativeError> {
        Err(unavailable("WebRTC"))
    }
}

impl ArBackend for Unavailable {
    fn is_supported(&self) -> bool {
        false
    }

    fn create_session(
        &self,
        _observer: Arc<dyn ArSessionObserver>,
    ) -> Result<Arc<dyn NativeArSession>, NativeError> {
        Err(unavailable("World tracking"))
    }
}

impl GamepadBackend for Unavailable {
    fn start(&self, _observer: Arc<dyn GamepadObserver>) -> Vec<PlayerIndex> {
        debug!("No game controller support; gamepad events disabled");
        Vec::new()
    }

    fn stop(&self) {}
}

impl DeviceScanBackend for Unavailable {
    fn create_scanner(
        &self,
        _observer: Arc<dyn DeviceScanObserver>,
    ) -> Result<Arc<dyn NativeDeviceScanner>, NativeError> {
        Err(unavailable("Bluetooth LE scanning"))
    }
}
