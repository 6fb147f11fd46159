//! World-tracking sessions.

mod session;
mod session_api;

pub use session::ArSession;
pub use session_api::ArSessionApi;

use crate::native::NativeTrackingState;

use models::ar::ArTrackingState;

/// Collapse the platform's tracking state to what the client needs.
pub fn tracking_state_from_native(state: NativeTrackingState) -> ArTrackingState {
    match state {
        NativeTrackingState::Normal => ArTrackingState::Normal,
        NativeTrackingState::Limited(_) => ArTrackingState::Limited,
        NativeTrackingState::NotAvailable => ArTrackingState::Unavailable,
    }
}
