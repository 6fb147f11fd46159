use crate::error::native::NativeError;

use models::{Handle, INVALID_HANDLE};

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Where a resource stands in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built but never handed to a registry.
    Constructed,
    /// Registered under a valid handle and not yet disposed.
    Active,
    /// The ready step failed; the resource never became addressable.
    Failed,
    /// Native resources released. Terminal.
    Disposed,
}

/// Per-resource bookkeeping shared by every registered type.
///
/// A resource is bound to at most one handle and released at most once.
#[derive(Debug)]
pub struct Lifecycle {
    handle: AtomicI64,
    bound: AtomicBool,
    disposed: AtomicBool,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            handle: AtomicI64::new(INVALID_HANDLE),
            bound: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Handle assigned at registration, or [`INVALID_HANDLE`].
    pub fn handle(&self) -> Handle {
        self.handle.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_disposed() {
            LifecycleState::Disposed
        } else if !self.bound.load(Ordering::Acquire) {
            LifecycleState::Constructed
        } else if self.handle() == INVALID_HANDLE {
            LifecycleState::Failed
        } else {
            LifecycleState::Active
        }
    }

    /// Bind the resource to `handle`. Binding twice is a programming error.
    #[track_caller]
    pub(crate) fn bind(&self, handle: Handle) {
        let already_bound = self.bound.swap(true, Ordering::AcqRel);
        assert!(
            !already_bound,
            "resource registered twice (already bound to handle {})",
            self.handle()
        );
        self.handle.store(handle, Ordering::Release);
    }

    /// Forget the handle after a failed ready step. The resource stays bound
    /// so it can never be registered again.
    pub(crate) fn fail(&self) {
        self.handle.store(INVALID_HANDLE, Ordering::Release);
    }

    /// Flip to disposed. Only the first caller gets `true`.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A native-backed object addressable by a [`Handle`].
///
/// Implementors embed a [`Lifecycle`] and let the owning
/// [`Registry`](super::Registry) drive it. `dispose` runs at most once, after
/// the resource has been removed from its registry, and is never called while
/// a registry lock is held.
pub trait ManagedResource: Send + Sync + 'static {
    fn lifecycle(&self) -> &Lifecycle;

    /// Ready step, run once the handle is known and before the resource
    /// becomes visible in the registry. An error discards the resource.
    fn on_registered(&self, handle: Handle) -> Result<(), NativeError> {
        let _ = handle;
        Ok(())
    }

    /// Release native resources and detach from native callbacks.
    fn dispose(&self);

    fn handle(&self) -> Handle {
        self.lifecycle().handle()
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle().is_disposed()
    }
}

/// Dispose `resource` unless something already did.
pub(crate) fn release<T: ManagedResource + ?Sized>(resource: &T) -> bool {
    if resource.lifecycle().mark_disposed() {
        resource.dispose();
        true
    } else {
        false
    }
}
