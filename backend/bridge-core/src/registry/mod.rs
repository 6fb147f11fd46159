//! Handle-indexed ownership of native-backed objects.
//!
//! A [`Registry`] hands out monotonically increasing handles, keeps every live
//! resource reachable by handle, and guarantees that each resource is disposed
//! exactly once. Its lock only ever guards the map itself: resource code
//! (`on_registered`, `dispose`) always runs with the lock released, so a
//! resource may register or unregister other resources from inside those
//! hooks.

mod lifecycle;

pub use lifecycle::{Lifecycle, LifecycleState, ManagedResource};
pub(crate) use lifecycle::release;

use models::{Handle, INVALID_HANDLE};

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

struct RegistryInner<T> {
    objects: HashMap<Handle, Arc<T>>,
    next_handle: Handle,
}

pub struct Registry<T: ManagedResource> {
    kind: &'static str,
    inner: Mutex<RegistryInner<T>>,
}

impl<T: ManagedResource> Registry<T> {
    /// `kind` names the resource type in logs and assertion messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            inner: Mutex::new(RegistryInner {
                objects: HashMap::new(),
                next_handle: 0,
            }),
        }
    }

    /// Assign the next handle to `resource`, run its ready step and make it
    /// addressable.
    ///
    /// Returns [`INVALID_HANDLE`] if the ready step fails; the reserved handle
    /// is never reused and the resource is dropped without being disposed.
    ///
    /// # Panics
    ///
    /// Panics if `resource` was registered before.
    #[track_caller]
    pub fn register(&self, resource: Arc<T>) -> Handle {
        let handle = {
            let mut inner = self.inner.lock();
            let handle = inner.next_handle;
            inner.next_handle += 1;
            handle
        };

        resource.lifecycle().bind(handle);

        if let Err(e) = resource.on_registered(handle) {
            resource.lifecycle().fail();
            warn!("{} #{} failed to initialize: {}", self.kind, handle, e);
            return INVALID_HANDLE;
        }

        self.inner.lock().objects.insert(handle, resource);
        debug!("Registered {} #{}", self.kind, handle);
        handle
    }

    /// Remove and dispose the resource under `handle`.
    ///
    /// Unknown handles are a normal outcome on idempotent teardown paths and
    /// return `None`.
    pub fn unregister(&self, handle: Handle) -> Option<Arc<T>> {
        let removed = self.inner.lock().objects.remove(&handle);
        let resource = removed?;

        if release(resource.as_ref()) {
            debug!("Disposed {} #{}", self.kind, handle);
        }
        Some(resource)
    }

    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        self.inner.lock().objects.get(&handle).cloned()
    }

    /// Like [`get`](Self::get), for call sites where the handle came from the
    /// remote client and must be live.
    ///
    /// # Panics
    ///
    /// Panics with `No <kind> with handle <h>` when the handle is unknown.
    /// Addressing a disposed or never-issued handle means the caller's view
    /// of the bridge is out of sync; there is no meaningful recovery.
    #[track_caller]
    pub fn get_checked(&self, handle: Handle) -> Arc<T> {
        match self.get(handle) {
            Some(resource) => resource,
            None => panic!("No {} with handle {}", self.kind, handle),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.inner.lock().objects.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.inner.lock().objects.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// Unregister everything, including resources registered by the
    /// disposal of others while this runs.
    pub fn dispose_all(&self) {
        let mut disposed = 0usize;
        loop {
            let next = {
                let mut inner = self.inner.lock();
                let Some(&handle) = inner.objects.keys().next() else {
                    break;
                };
                inner.objects.remove(&handle)
            };

            if let Some(resource) = next
                && release(resource.as_ref())
            {
                disposed += 1;
            }
        }

        if disposed > 0 {
            info!("Disposed {} {} resource(s)", disposed, self.kind);
        }
    }
}

impl<T: ManagedResource> Drop for Registry<T> {
    fn drop(&mut self) {
        let leftovers: Vec<Arc<T>> = self.inner.get_mut().objects.drain().map(|(_, r)| r).collect();
        if !leftovers.is_empty() {
            warn!(
                "{} registry dropped with {} live resource(s); disposing",
                self.kind,
                leftovers.len()
            );
        }
        for resource in leftovers {
            release(resource.as_ref());
        }
    }
}
