//! Handle to a running IPC server.

use crate::IPC_URL_PREFIX;

use std::net::SocketAddr;

use log::info;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A background task accepting WebSocket clients on localhost.
///
/// Dropping the handle stops accepting new clients. Connections that are
/// already authenticated keep running until their client disconnects.
pub struct IpcServerHandle {
    local_addr: SocketAddr,
    auth_token: String,
    shutdown: Option<oneshot::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
}

impl IpcServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        auth_token: String,
        shutdown: oneshot::Sender<()>,
        accept_task: JoinHandle<()>,
    ) -> Self {
        Self {
            local_addr,
            auth_token,
            shutdown: Some(shutdown),
            accept_task: Some(accept_task),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound port. Differs from the requested one when port 0 was asked for.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Token clients must present in their auth handshake.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// `ws://127.0.0.1:<port>`
    pub fn url(&self) -> String {
        format!("{}:{}", IPC_URL_PREFIX, self.port())
    }

    /// Stop accepting clients and wait for the accept loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        info!("IPC server on port {} stopped", self.port());
    }
}

impl Drop for IpcServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
