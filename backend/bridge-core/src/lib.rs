//! Host-side bridge exposing native media, tracking, input and device
//! scanning resources to a remote UI client through opaque integer handles.

pub mod ar;
pub mod config;
pub mod device_scan;
pub mod dispatch;
pub mod error;
pub mod gamepad;
pub mod host;
pub mod ipc;
pub mod native;
pub mod proto;
pub mod registry;
pub mod rtc;

#[cfg(test)]
mod tests;

pub const IPC_HOSTNAME: &str = "127.0.0.1";
pub const IPC_URL_PREFIX: &str = const_format::concatcp!("ws://", IPC_HOSTNAME);
