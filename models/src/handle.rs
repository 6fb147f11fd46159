/// Identifier the remote client uses to address a host-side resource.
///
/// Unique within one registry for as long as the resource is registered and
/// never reused afterwards.
pub type Handle = i64;

/// "No resource" sentinel. Never assigned to a live resource.
pub const INVALID_HANDLE: Handle = -1;

/// Interpret an optional handle argument: the sentinel means "clear".
pub fn optional_handle(handle: Handle) -> Option<Handle> {
    if handle == INVALID_HANDLE {
        None
    } else {
        Some(handle)
    }
}
