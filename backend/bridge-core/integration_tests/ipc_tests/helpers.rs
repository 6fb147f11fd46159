//! Test helpers for IPC integration tests.
//!
//! This module provides utilities for testing the IPC WebSocket server:
//! - Starting a server over the loopback backend
//! - Connecting and authenticating
//! - Sending requests and separating responses from events
//! - Connection state checks

use bridge_core::config::BridgeConfig;
use bridge_core::host::BridgeHost;
use bridge_core::ipc::{IpcServerHandle, ServerOptions, start_ipc_server};
use bridge_core::native::NativeBackend;
use bridge_core::native::loopback::Loopback;
use bridge_core::proto::{
    IpcAuthHandshake, IpcAuthHandshakeResponse, IpcClientMessage, IpcEvent, IpcServerMessage,
    ipc_client_message, ipc_server_message,
};

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test constants for authentication
pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

/// A running server with the loopback hooks behind it.
pub struct TestServer {
    pub handle: IpcServerHandle,
    pub host: Arc<BridgeHost>,
    pub hooks: Loopback,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.handle.port()
    }
}

/// Test helper: Start a server on an ephemeral port.
pub async fn start_test_server(options: ServerOptions) -> TestServer {
    let (backend, hooks) = NativeBackend::loopback();
    let host = BridgeHost::new(&BridgeConfig::default(), backend);
    let handle = start_ipc_server(
        0,
        Some(String::from(TEST_AUTH_TOKEN)),
        host.clone(),
        options,
    )
    .await
    .expect("Failed to start IPC server");
    TestServer {
        handle,
        host,
        hooks,
    }
}

/// Test helper: Connect to IPC server and return WebSocket stream.
pub async fn connect_to_server(ipc_port: u16) -> Client {
    let url = format!("ws://127.0.0.1:{}", ipc_port);
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Test helper: Connect and authenticate with the test token.
pub async fn connect_authenticated(ipc_port: u16) -> Client {
    let mut ws = connect_to_server(ipc_port).await;
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    assert!(response.success, "Auth should succeed");
    ws
}

/// Test helper: Send protobuf message over WebSocket.
pub async fn send_protobuf<T: ProstMessage>(ws: &mut Client, message: &T) {
    let mut buf = Vec::new();
    message.encode(&mut buf).expect("Failed to encode protobuf");
    ws.send(Message::Binary(buf.into()))
        .await
        .expect("Failed to send message");
}

/// Test helper: Receive and decode protobuf message.
pub async fn receive_protobuf<T: ProstMessage + Default>(ws: &mut Client) -> T {
    let msg = tokio::time::timeout(RECEIVE_TIMEOUT, ws.next())
        .await
        .expect("Timed out waiting for message")
        .expect("No message received")
        .expect("Error receiving message");

    let bytes = msg.into_data();
    T::decode(&bytes[..]).expect("Failed to decode protobuf")
}

/// Test helper: Send auth handshake and return response.
pub async fn authenticate(ws: &mut Client, token: &str) -> IpcAuthHandshakeResponse {
    let auth_msg = IpcClientMessage {
        request_id: 1,
        payload: Some(ipc_client_message::Payload::AuthHandshake(
            IpcAuthHandshake {
                token: token.to_string(),
            },
        )),
    };

    send_protobuf(ws, &auth_msg).await;

    let response: IpcServerMessage = receive_protobuf(ws).await;
    match response.payload {
        Some(ipc_server_message::Payload::AuthHandshakeResponse(resp)) => resp,
        _ => panic!("Expected AuthHandshakeResponse, got something else"),
    }
}

/// Test helper: Send one request and wait for its response, collecting any
/// events that arrive in between into `events`.
pub async fn request(
    ws: &mut Client,
    request_id: u64,
    payload: ipc_client_message::Payload,
    events: &mut Vec<IpcEvent>,
) -> ipc_server_message::Payload {
    send_protobuf(
        ws,
        &IpcClientMessage {
            request_id,
            payload: Some(payload),
        },
    )
    .await;

    loop {
        let message: IpcServerMessage = receive_protobuf(ws).await;
        match message.payload {
            Some(ipc_server_message::Payload::Event(event)) => {
                assert_eq!(message.request_id, 0, "Events carry request_id 0");
                events.push(event);
            }
            Some(payload) => {
                assert_eq!(
                    message.request_id, request_id,
                    "Response should echo the request_id"
                );
                return payload;
            }
            None => panic!("Server sent a message without payload"),
        }
    }
}

/// Test helper: Read events until `done` holds for the collected list.
pub async fn receive_events_until(
    ws: &mut Client,
    events: &mut Vec<IpcEvent>,
    done: impl Fn(&[IpcEvent]) -> bool,
) {
    while !done(events) {
        let message: IpcServerMessage = receive_protobuf(ws).await;
        match message.payload {
            Some(ipc_server_message::Payload::Event(event)) => events.push(event),
            other => panic!("Expected an event, got response {:?}", other),
        }
    }
}

/// Test helper: Check if WebSocket connection is closed.
pub async fn is_connection_closed(ws: &mut Client) -> bool {
    match tokio::time::timeout(Duration::from_millis(100), ws.next()).await {
        Err(_) => true,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}
