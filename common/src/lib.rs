//! Cross-crate utilities shared by every layer of the bridge.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking used by every error enum
//! - **models**: pure data exchanged between the host and the remote client
//! - **bridge-core**: registries, subsystems and the IPC transport
//! - **vcam-host**: the binary wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
