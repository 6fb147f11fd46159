//! WebSocket IPC between the remote UI client and the bridge host.
//!
//! - Localhost-only WebSocket server
//! - Binary protobuf protocol, see `proto/bridge.proto`
//! - Authentication handshake as the first message
//! - Request/response for commands, unsolicited frames for events
//!
//! Responses echo the request's `request_id`; events carry `request_id` 0.

pub(crate) mod connection_state;
pub(crate) mod convert;
mod handle;
mod router;
mod server;

pub use handle::IpcServerHandle;
pub use server::{ServerOptions, start_ipc_server};
