//! IPC WebSocket server.
//!
//! The server:
//!
//! - Listens on localhost only and rejects non-loopback peers
//! - Speaks binary protobuf frames (`proto/bridge.proto`)
//! - Requires an auth handshake as the first message
//! - Pushes every [`BridgeEvent`] to each authenticated client
//!
//! # Connection model
//!
//! Each connection has a reader (this task) and a writer task. Requests are
//! served one at a time in arrival order, so commands on the same resource
//! never overtake each other. Responses and events share a single outbound
//! queue drained by the writer.
//!
//! A request that trips a subsystem assertion (an unknown handle) is answered
//! with `PROTOCOL_VIOLATION` and the connection is closed.

use crate::IPC_HOSTNAME;
use crate::config::BridgeConfig;
use crate::error::ipc::IpcError;
use crate::host::BridgeHost;
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::convert::error_code;
use crate::ipc::handle::IpcServerHandle;
use crate::ipc::router;
use crate::proto::IpcErrorCode::{AuthError, InvalidMessage, ProtocolViolation};
use crate::proto::{
    IpcAuthHandshakeResponse, IpcClientMessage, IpcErrorCode, IpcErrorResponse, IpcEvent,
    IpcServerMessage, ipc_client_message, ipc_server_message,
};

use common::ErrorLocation;
use models::BridgeEvent;

use std::any::Any;
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, Location};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use prost::Message as ProstMessage;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Per-server behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Upper bound for commands that wait on a native completion.
    pub request_timeout: Duration,
    /// Release client-created resources when the last client disconnects.
    pub dispose_on_disconnect: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for ServerOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            request_timeout: config.requests.timeout(),
            dispose_on_disconnect: config.ipc.dispose_on_disconnect,
        }
    }
}

struct Shared {
    host: Arc<BridgeHost>,
    auth_token: String,
    options: ServerOptions,
    clients: AtomicUsize,
}

/// Starts the IPC WebSocket server on `127.0.0.1:<ipc_port>`.
///
/// Port 0 binds an ephemeral port; the returned handle reports the real one.
/// When `auth_token` is `None` a random token is generated and logged.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port cannot be bound.
pub async fn start_ipc_server(
    ipc_port: u16,
    auth_token: Option<String>,
    host: Arc<BridgeHost>,
    options: ServerOptions,
) -> Result<IpcServerHandle, IpcError> {
    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        info!("Generated IPC auth token: {}", token);
        token
    });

    let listener = TcpListener::bind((IPC_HOSTNAME, ipc_port)).await?;
    let local_addr = listener.local_addr()?;
    info!("IPC server listening on {}", local_addr);

    let shared = Arc::new(Shared {
        host,
        auth_token: auth_token.clone(),
        options,
        clients: AtomicUsize::new(0),
    });

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let accept_task = TokioSpawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("Client connecting from {}", addr);
                        let shared = shared.clone();
                        TokioSpawn(async move {
                            if let Err(e) = handle_connection(stream, addr, shared).await {
                                error!("Connection {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept IPC connection: {}", e),
                },
            }
        }
        debug!("IPC accept loop on {} exited", local_addr);
    });

    Ok(IpcServerHandle::new(
        local_addr,
        auth_token,
        shutdown_tx,
        accept_task,
    ))
}

/// Serve one client from WebSocket upgrade to disconnect.
///
/// # Errors
///
/// - [`IpcError::Handshake`] - WebSocket upgrade failed
/// - [`IpcError::Read`] - Reading a frame failed
/// - [`IpcError::Send`] - Writing the auth response failed
/// - [`IpcError::ProtocolViolation`] - A request hit a subsystem assertion
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<Shared>,
) -> Result<(), IpcError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", addr);
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (mut write, mut read) = ws_stream.split();
    let mut state = ConnectionState::new(shared.auth_token.clone());

    authenticate(&mut read, &mut write, &mut state, addr).await?;
    if !state.is_authenticated() {
        return Ok(());
    }

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let writer = TokioSpawn(write_loop(
        write,
        outbound_rx,
        shared.host.subscribe(),
        addr,
    ));
    let clients = shared.clients.fetch_add(1, Ordering::SeqCst) + 1;
    debug!("{} authenticated client(s)", clients);

    let result = read_loop(&mut read, &outbound_tx, &shared, addr).await;

    drop(outbound_tx);
    if let Err(e) = writer.await {
        error!("Writer task for {} failed: {}", addr, e);
    }

    let remaining = shared.clients.fetch_sub(1, Ordering::SeqCst) - 1;
    info!("Client {} disconnected ({} remaining)", addr, remaining);
    if remaining == 0 && shared.options.dispose_on_disconnect {
        info!("Last client left, disposing client resources");
        shared.host.dispose_client_resources();
    }

    result
}

/// Process the mandatory first message. Leaves `state` unauthenticated when
/// the client must be dropped.
async fn authenticate(
    read: &mut WsSource,
    write: &mut WsSink,
    state: &mut ConnectionState,
    addr: SocketAddr,
) -> Result<(), IpcError> {
    let Some(msg) = read.next().await else {
        warn!("Client {} disconnected before sending auth", addr);
        return Ok(());
    };

    let data = match msg {
        Ok(Message::Binary(data)) => data,
        Ok(_) => {
            warn!("Client {} sent non-binary first message", addr);
            return Ok(());
        }
        Err(e) => {
            return Err(IpcError::Read {
                message: format!("Error reading first message: {}", e),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    let client_msg = IpcClientMessage::decode(&data[..])?;
    let Some(ipc_client_message::Payload::AuthHandshake(auth)) = client_msg.payload else {
        warn!(
            "Client {} auth failed: first message was not auth handshake",
            addr
        );
        return Ok(());
    };

    if state.validate_token(&auth.token) {
        info!("Client {} authenticated successfully", addr);
        send_auth_response(write, client_msg.request_id, true, None).await
    } else {
        warn!("Client {} auth failed: invalid token", addr);
        send_auth_response(
            write,
            client_msg.request_id,
            false,
            Some("Invalid authentication token"),
        )
        .await
    }
}

async fn read_loop(
    read: &mut WsSource,
    outbound: &mpsc::UnboundedSender<IpcServerMessage>,
    shared: &Shared,
    addr: SocketAddr,
) -> Result<(), IpcError> {
    while let Some(msg) = read.next().await {
        let data = match msg {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                debug!("Ignoring non-binary frame from {}", addr);
                continue;
            }
            Err(e) => {
                return Err(IpcError::Read {
                    message: format!("Error reading message: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let client_msg = match IpcClientMessage::decode(&data[..]) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Failed to decode protobuf from {}: {}", addr, e);
                queue(outbound, error_message(0, InvalidMessage, "Invalid protobuf message"));
                continue;
            }
        };

        let request_id = client_msg.request_id;
        let Some(payload) = client_msg.payload else {
            warn!("Client {} sent message with no payload", addr);
            queue(
                outbound,
                error_message(request_id, InvalidMessage, "No payload in message"),
            );
            continue;
        };

        if matches!(payload, ipc_client_message::Payload::AuthHandshake(_)) {
            queue(
                outbound,
                error_message(request_id, AuthError, "Auth handshake already completed"),
            );
            continue;
        }

        let routed = AssertUnwindSafe(router::handle_request(
            &shared.host,
            payload,
            shared.options.request_timeout,
        ))
        .catch_unwind()
        .await;

        match routed {
            Ok(Ok(response)) => queue(
                outbound,
                IpcServerMessage {
                    request_id,
                    payload: Some(response),
                },
            ),
            Ok(Err(e)) => {
                warn!("Request {} from {} failed: {}", request_id, addr, e);
                queue(
                    outbound,
                    error_message(request_id, error_code(&e), &e.to_string()),
                );
            }
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!(
                    "Request {} from {} violated the protocol: {}",
                    request_id, addr, reason
                );
                queue(
                    outbound,
                    error_message(request_id, ProtocolViolation, &reason),
                );
                return Err(IpcError::ProtocolViolation {
                    message: reason,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }
    Ok(())
}

/// Drain responses and events into the socket until the reader hangs up.
async fn write_loop(
    mut write: WsSink,
    mut outbound: mpsc::UnboundedReceiver<IpcServerMessage>,
    mut events: broadcast::Receiver<BridgeEvent>,
    addr: SocketAddr,
) {
    let mut events_open = true;
    loop {
        let message = tokio::select! {
            biased;
            response = outbound.recv() => match response {
                Some(response) => response,
                None => break,
            },
            event = events.recv(), if events_open => match event {
                Ok(event) => event_message(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged behind, {} event(s) dropped", addr, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    events_open = false;
                    continue;
                }
            },
        };

        if let Err(e) = send_message(&mut write, &message).await {
            error!("Failed to write to {}: {}", addr, e);
            break;
        }
    }
    let _ = write.close().await;
}

fn queue(outbound: &mpsc::UnboundedSender<IpcServerMessage>, message: IpcServerMessage) {
    if outbound.send(message).is_err() {
        debug!("Writer already gone, dropping message");
    }
}

fn event_message(event: BridgeEvent) -> IpcServerMessage {
    IpcServerMessage {
        request_id: 0,
        payload: Some(ipc_server_message::Payload::Event(IpcEvent::from(event))),
    }
}

fn error_message(request_id: u64, code: IpcErrorCode, message: &str) -> IpcServerMessage {
    IpcServerMessage {
        request_id,
        payload: Some(ipc_server_message::Payload::Error(IpcErrorResponse {
            code: code as i32,
            message: message.to_string(),
        })),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "request handler panicked".to_string()
    }
}

async fn send_auth_response(
    write: &mut WsSink,
    request_id: u64,
    success: bool,
    error: Option<&str>,
) -> Result<(), IpcError> {
    let response = IpcServerMessage {
        request_id,
        payload: Some(ipc_server_message::Payload::AuthHandshakeResponse(
            IpcAuthHandshakeResponse {
                success,
                error: error.map(|s| s.to_string()),
            },
        )),
    };
    send_message(write, &response).await
}

async fn send_message(write: &mut WsSink, message: &IpcServerMessage) -> Result<(), IpcError> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;

    write
        .send(Message::Binary(buf.into()))
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send message: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
