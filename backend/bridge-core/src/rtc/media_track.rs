use crate::native::NativeMediaTrack;
use crate::registry::{Lifecycle, ManagedResource};

use models::rtc::MediaKind;

use std::sync::Arc;

use log::debug;

/// A remote media track, addressable so video views can render it.
///
/// The native track belongs to its peer connection; disposing the wrapper
/// only makes the handle unusable.
pub struct MediaTrack {
    lifecycle: Lifecycle,
    native: Arc<dyn NativeMediaTrack>,
    kind: MediaKind,
}

impl MediaTrack {
    pub(crate) fn new(native: Arc<dyn NativeMediaTrack>, kind: MediaKind) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            native,
            kind,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn native(&self) -> &Arc<dyn NativeMediaTrack> {
        &self.native
    }
}

impl ManagedResource for MediaTrack {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn dispose(&self) {
        debug!("Released {:?} track {}", self.kind, self.native.id());
    }
}
