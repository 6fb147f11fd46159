//! Domain models for the bridge.
//!
//! Pure data exchanged between the host and the remote UI client: handles,
//! connection and channel states, session descriptions, input events and the
//! [`BridgeEvent`] stream. Models carry no behavior beyond validation and
//! small conversions; `bridge-core` owns the logic operating on them.

pub mod ar;
pub mod device;
pub mod error;
pub mod event;
pub mod gamepad;
pub mod handle;
pub mod rtc;

pub use error::model_error::ModelError;
pub use event::BridgeEvent;
pub use handle::{Handle, INVALID_HANDLE, optional_handle};

#[cfg(test)]
mod tests;
