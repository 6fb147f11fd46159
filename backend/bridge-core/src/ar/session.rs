use crate::ar::session_api::ArSessionApi;
use crate::ar::tracking_state_from_native;
use crate::error::native::NativeError;
use crate::native::{
    ArBackend, ArRunConfig, ArSessionObserver, NativeArFrame, NativeArSession, NativeTrackingState,
};
use crate::registry::{Lifecycle, ManagedResource};

use models::ar::{ArFrame, ArTrackingState};
use models::{BridgeEvent, Handle};

use std::sync::{Arc, Weak};

use log::{debug, warn};
use parking_lot::Mutex;

/// One native world-tracking session.
///
/// Frames are forwarded only while tracking is `Normal`; the camera pose is
/// meaningless otherwise.
pub struct ArSession {
    lifecycle: Lifecycle,
    this: Weak<ArSession>,
    api: Weak<ArSessionApi>,
    backend: Arc<dyn ArBackend>,
    native: Mutex<Option<Arc<dyn NativeArSession>>>,
    tracking_state: Mutex<ArTrackingState>,
}

impl ArSession {
    pub(crate) fn new(api: Weak<ArSessionApi>, backend: Arc<dyn ArBackend>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            lifecycle: Lifecycle::new(),
            this: this.clone(),
            api,
            backend,
            native: Mutex::new(None),
            tracking_state: Mutex::new(ArTrackingState::Unavailable),
        })
    }

    pub fn tracking_state(&self) -> ArTrackingState {
        *self.tracking_state.lock()
    }

    fn native(&self) -> Option<Arc<dyn NativeArSession>> {
        let native = self.native.lock().clone();
        if native.is_none() {
            warn!("AR session #{} has no native session", self.handle());
        }
        native
    }

    pub(crate) fn run(&self, config: &ArRunConfig) {
        if let Some(native) = self.native() {
            native.run(config);
        }
    }

    pub(crate) fn pause(&self) {
        if let Some(native) = self.native() {
            native.pause();
        }
    }

    /// Record `state` and report it if it changed.
    fn update_tracking_state(&self, api: &ArSessionApi, state: ArTrackingState) {
        {
            let mut current = self.tracking_state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        debug!("AR session #{} tracking is now {:?}", self.handle(), state);
        api.events().emit(BridgeEvent::ArTrackingStateChanged {
            session: self.handle(),
            state,
        });
    }

    fn on_tracking_state_change(&self, state: NativeTrackingState) {
        if let Some(api) = self.api.upgrade() {
            self.update_tracking_state(&api, tracking_state_from_native(state));
        }
    }

    fn on_frame(&self, frame: NativeArFrame) {
        let Some(api) = self.api.upgrade() else {
            return;
        };
        let state = tracking_state_from_native(frame.tracking_state);
        self.update_tracking_state(&api, state);
        if state != ArTrackingState::Normal {
            return;
        }
        api.events().emit(BridgeEvent::ArFrame {
            session: self.handle(),
            frame: ArFrame {
                camera_transform: frame.camera_transform,
            },
        });
    }
}

impl ManagedResource for ArSession {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_registered(&self, _handle: Handle) -> Result<(), NativeError> {
        let observer = Arc::new(SessionObserver {
            session: self.this.clone(),
        });
        let native = self.backend.create_session(observer)?;
        *self.native.lock() = Some(native);
        Ok(())
    }

    fn dispose(&self) {
        let native = self.native.lock().take();
        if let Some(native) = native {
            native.pause();
            native.close();
        }
    }
}

struct SessionObserver {
    session: Weak<ArSession>,
}

impl SessionObserver {
    fn live(&self) -> Option<Arc<ArSession>> {
        self.session.upgrade().filter(|session| !session.is_disposed())
    }
}

impl ArSessionObserver for SessionObserver {
    fn on_tracking_state_change(&self, state: NativeTrackingState) {
        if let Some(session) = self.live() {
            session.on_tracking_state_change(state);
        }
    }

    fn on_frame(&self, frame: NativeArFrame) {
        if let Some(session) = self.live() {
            session.on_frame(frame);
        }
    }
}
