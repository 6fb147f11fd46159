use crate::error::native::NativeError;
use crate::registry::{Lifecycle, LifecycleState, ManagedResource, Registry};

use common::ErrorLocation;
use models::{Handle, INVALID_HANDLE};

use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type OnDispose = Box<dyn FnOnce() + Send>;

/// Counts its disposals and can fail its ready step or run a hook on dispose.
struct Counted {
    lifecycle: Lifecycle,
    fail_ready: bool,
    disposals: AtomicUsize,
    on_dispose: Mutex<Option<OnDispose>>,
}

impl Counted {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Lifecycle::new(),
            fail_ready: false,
            disposals: AtomicUsize::new(0),
            on_dispose: Mutex::new(None),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Lifecycle::new(),
            fail_ready: true,
            disposals: AtomicUsize::new(0),
            on_dispose: Mutex::new(None),
        })
    }

    fn with_dispose_hook(hook: impl FnOnce() + Send + 'static) -> Arc<Self> {
        let resource = Self::new();
        *resource.on_dispose.lock() = Some(Box::new(hook));
        resource
    }

    fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl ManagedResource for Counted {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn on_registered(&self, _handle: Handle) -> Result<(), NativeError> {
        if self.fail_ready {
            return Err(NativeError::Operation {
                message: "ready step refused".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_dispose.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// **VALUE**: Handles start at 0, increase by one, and unregistering one
/// resource leaves the others addressable.
///
/// **WHY THIS MATTERS**: The remote client addresses every resource by these
/// integers. A reused or shifted handle would route a command to the wrong
/// native object.
///
/// **BUG THIS CATCHES**: Would catch a registry that recycles freed handles,
/// disposes the wrong entry, or disposes more than once.
#[test]
fn given_two_resources_when_first_unregistered_then_only_first_disposed_once() {
    // GIVEN: Two registered resources
    let registry = Registry::new("counted");
    let r1 = Counted::new();
    let r2 = Counted::new();
    assert_eq!(registry.register(r1.clone()), 0);
    assert_eq!(registry.register(r2.clone()), 1);

    // WHEN: Unregistering the first
    let removed = registry.unregister(0);

    // THEN: R1 is disposed exactly once and R2 is untouched
    assert!(removed.is_some());
    assert_eq!(r1.disposals(), 1);
    assert_eq!(r2.disposals(), 0);
    assert!(Arc::ptr_eq(&registry.get(1).expect("R2 missing"), &r2));
    assert!(!registry.contains(0));

    // THEN: The freed handle is never reused
    assert_eq!(registry.register(Counted::new()), 2);
}

/// **VALUE**: Unregistering an unknown or already removed handle is a no-op.
///
/// **WHY THIS MATTERS**: Teardown paths race (a channel closing natively while
/// the client disposes it). Both must be able to call unregister safely.
///
/// **BUG THIS CATCHES**: Would catch a second dispose call or a panic on an
/// unknown handle.
#[test]
fn given_unregistered_handle_when_unregistered_again_then_no_second_dispose() {
    // GIVEN: A resource that was already unregistered
    let registry = Registry::new("counted");
    let resource = Counted::new();
    let handle = registry.register(resource.clone());
    registry.unregister(handle);

    // WHEN: Unregistering it again, and an unknown handle
    let again = registry.unregister(handle);
    let unknown = registry.unregister(42);

    // THEN: Both return None and dispose ran once
    assert!(again.is_none());
    assert!(unknown.is_none());
    assert_eq!(resource.disposals(), 1);
    assert_eq!(resource.lifecycle().state(), LifecycleState::Disposed);
}

/// **VALUE**: A failing ready step yields the invalid handle and burns the
/// reserved one.
///
/// **WHY THIS MATTERS**: The client must be able to tell "native construction
/// failed" from success without an exception crossing the boundary.
///
/// **BUG THIS CATCHES**: Would catch a registry that inserts half-built
/// resources, disposes them, or reuses the reserved handle.
#[test]
fn given_failing_ready_step_when_registered_then_returns_invalid_handle() {
    // GIVEN: A resource whose ready step fails
    let registry = Registry::new("counted");
    let resource = Counted::failing();

    // WHEN: Registering it
    let handle = registry.register(resource.clone());

    // THEN: Invalid handle, nothing stored, nothing disposed
    assert_eq!(handle, INVALID_HANDLE);
    assert!(registry.is_empty());
    assert_eq!(resource.disposals(), 0);
    assert_eq!(resource.lifecycle().state(), LifecycleState::Failed);

    // THEN: The next registration does not get the burned handle
    assert_eq!(registry.register(Counted::new()), 1);
}

/// **VALUE**: Registering the same resource twice is rejected.
///
/// **WHY THIS MATTERS**: A resource with two handles would be disposed twice
/// or leak under one of them.
///
/// **BUG THIS CATCHES**: Would catch the bind-once assertion being removed.
#[test]
#[should_panic(expected = "registered twice")]
fn given_registered_resource_when_registered_again_then_panics() {
    // GIVEN: A registered resource
    let registry = Registry::new("counted");
    let resource = Counted::new();
    registry.register(resource.clone());

    // WHEN/THEN: Registering it again panics
    registry.register(resource);
}

/// **VALUE**: Checked lookups of unknown handles fail loudly with the kind
/// and handle in the message.
///
/// **WHY THIS MATTERS**: The IPC server turns this panic into a protocol
/// violation; the message is what the client sees.
///
/// **BUG THIS CATCHES**: Would catch get_checked silently returning a default
/// or a changed message format.
#[test]
#[should_panic(expected = "No resource with handle 7")]
fn given_unknown_handle_when_get_checked_then_panics_with_kind() {
    let registry: Registry<Counted> = Registry::new("counted");
    registry.get_checked(7);
}

/// **VALUE**: dispose_all also disposes resources registered while it runs.
///
/// **WHY THIS MATTERS**: Disposing one resource may create or release others
/// in the same registry (e.g. native close callbacks).
///
/// **BUG THIS CATCHES**: Would catch iterating over a snapshot (leaving late
/// registrations alive) or holding the registry lock while disposing
/// (deadlock).
#[test]
fn given_dispose_registering_new_resource_when_dispose_all_then_registry_empty() {
    // GIVEN: A resource whose disposal registers another resource
    let registry = Arc::new(Registry::new("counted"));
    let late = Counted::new();
    let weak: Weak<Registry<Counted>> = Arc::downgrade(&registry);
    let late_clone = late.clone();
    let first = Counted::with_dispose_hook(move || {
        if let Some(registry) = weak.upgrade() {
            registry.register(late_clone);
        }
    });
    registry.register(first.clone());
    registry.register(Counted::new());

    // WHEN: Disposing everything
    registry.dispose_all();

    // THEN: Both the original and the late resource were disposed once
    assert!(registry.is_empty());
    assert_eq!(first.disposals(), 1);
    assert_eq!(late.disposals(), 1);
}

/// **VALUE**: dispose_all tolerates resources that unregister themselves from
/// their own dispose.
///
/// **WHY THIS MATTERS**: Closing a data channel natively makes it unregister
/// its own handle, and that close can run inside dispose_all.
///
/// **BUG THIS CATCHES**: Would catch a second release of an entry dispose_all
/// already removed, or a deadlock on the registry lock.
#[test]
fn given_resources_unregistering_themselves_when_dispose_all_then_each_disposed_once() {
    // GIVEN: Three resources whose disposal unregisters their own handle
    let registry = Arc::new(Registry::new("counted"));
    let resources: Vec<Arc<Counted>> = (0..3)
        .map(|_| {
            let own_handle = Arc::new(Mutex::new(INVALID_HANDLE));
            let weak = Arc::downgrade(&registry);
            let hook_handle = own_handle.clone();
            let resource = Counted::with_dispose_hook(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.unregister(*hook_handle.lock());
                }
            });
            *own_handle.lock() = registry.register(resource.clone());
            resource
        })
        .collect();

    // WHEN: Disposing everything
    registry.dispose_all();

    // THEN: The registry is empty and every resource was disposed once
    assert!(registry.is_empty());
    for resource in &resources {
        assert_eq!(resource.disposals(), 1);
    }
}

/// **VALUE**: A resource may unregister another one from inside its own
/// dispose without deadlocking.
///
/// **WHY THIS MATTERS**: Peer connections unregister their tracks and data
/// channels during their own disposal.
///
/// **BUG THIS CATCHES**: Would catch dispose being invoked under the registry
/// lock.
#[test]
fn given_dispose_unregistering_sibling_when_unregistered_then_both_disposed() {
    // GIVEN: A parent whose disposal unregisters a child in the same registry
    let registry = Arc::new(Registry::new("counted"));
    let child = Counted::new();
    let child_handle = registry.register(child.clone());
    let weak = Arc::downgrade(&registry);
    let parent = Counted::with_dispose_hook(move || {
        if let Some(registry) = weak.upgrade() {
            registry.unregister(child_handle);
        }
    });
    let parent_handle = registry.register(parent.clone());

    // WHEN: Unregistering the parent
    registry.unregister(parent_handle);

    // THEN: Both are gone and each was disposed once
    assert!(registry.is_empty());
    assert_eq!(parent.disposals(), 1);
    assert_eq!(child.disposals(), 1);
}

/// **VALUE**: Concurrent unregisters of the same handle dispose exactly once.
///
/// **WHY THIS MATTERS**: Native callbacks arrive on SDK threads while the
/// client's requests are served on the runtime.
///
/// **BUG THIS CATCHES**: Would catch a check-then-remove race in unregister.
#[test]
fn given_many_threads_when_unregistering_same_handle_then_single_dispose() {
    // GIVEN: One registered resource
    let registry = Arc::new(Registry::new("counted"));
    let resource = Counted::new();
    let handle = registry.register(resource.clone());

    // WHEN: Eight threads unregister it at once
    let winners: usize = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.unregister(handle).is_some())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| usize::from(t.join().expect("thread panicked")))
        .sum();

    // THEN: Exactly one thread removed it, and it was disposed once
    assert_eq!(winners, 1);
    assert_eq!(resource.disposals(), 1);
}

/// **VALUE**: handles() lists live handles in ascending order.
///
/// **WHY THIS MATTERS**: The active gamepad list is served from it.
///
/// **BUG THIS CATCHES**: Would catch hash-order leaking to the client.
#[test]
fn given_several_resources_when_listing_handles_then_sorted() {
    let registry = Registry::new("counted");
    for _ in 0..5 {
        registry.register(Counted::new());
    }
    registry.unregister(2);

    assert_eq!(registry.handles(), vec![0, 1, 3, 4]);
    assert_eq!(registry.len(), 4);
}

/// **VALUE**: Dropping a registry releases what it still holds.
///
/// **WHY THIS MATTERS**: A subsystem torn down without dispose_all must not
/// leak native objects.
///
/// **BUG THIS CATCHES**: Would catch a missing Drop impl.
#[test]
fn given_live_resources_when_registry_dropped_then_disposed() {
    let resource = Counted::new();
    {
        let registry = Registry::new("counted");
        registry.register(resource.clone());
    }
    assert_eq!(resource.disposals(), 1);
}

#[test]
fn given_new_lifecycle_when_inspected_then_constructed_with_invalid_handle() {
    let lifecycle = Lifecycle::new();

    assert_eq!(lifecycle.state(), LifecycleState::Constructed);
    assert_eq!(lifecycle.handle(), INVALID_HANDLE);
    assert!(!lifecycle.is_disposed());
}
