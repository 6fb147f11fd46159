//! IPC server integration tests.
//!
//! Every test starts its own server on an ephemeral port over the loopback
//! backend and talks to it through a real WebSocket client.

use crate::ipc_tests::helpers::{
    Client, TestServer, authenticate, connect_authenticated, connect_to_server, is_connection_closed,
    receive_events_until, receive_protobuf, request, send_protobuf, start_test_server,
};

use bridge_core::ipc::ServerOptions;
use bridge_core::native::{DeviceAdvertisement, NativeProductId};
use bridge_core::proto::{
    ArAvailabilityKind, DeviceProductKind, IpcArSessionRequest, IpcAuthHandshake,
    IpcClientMessage, IpcCreateDataChannelRequest, IpcCreatePeerConnectionRequest,
    IpcEmptyRequest, IpcErrorCode, IpcEvent, IpcPeerConnectionRequest, IpcScannerRequest,
    IpcSendDataChannelMessageRequest, IpcServerMessage, IpcSetDescriptionRequest,
    RtcDataBuffer, RtcPeerConnectionState, RtcSdpType, RtcSessionDescription, ipc_client_message,
    ipc_event, ipc_server_message,
};

use std::time::Duration;

use futures_util::SinkExt;

type Request = ipc_client_message::Payload;
type Response = ipc_server_message::Payload;

const REMOTE_OFFER: &str = "v=0\r\no=remote 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

fn expect_handle(response: Response) -> i64 {
    match response {
        Response::Handle(handle) => handle.handle,
        other => panic!("Expected Handle response, got {:?}", other),
    }
}

fn expect_error(response: Response, code: IpcErrorCode) -> String {
    match response {
        Response::Error(err) => {
            assert_eq!(err.code, code as i32, "Unexpected error: {}", err.message);
            err.message
        }
        other => panic!("Expected {:?} error, got {:?}", code, other),
    }
}

fn reached_state(events: &[IpcEvent], connection: i64, state: RtcPeerConnectionState) -> bool {
    events.iter().any(|event| {
        matches!(
            &event.event,
            Some(ipc_event::Event::PeerConnectionState(e))
                if e.connection == connection && e.state == state as i32
        )
    })
}

/// Poll `condition` until it holds or two seconds pass.
async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..40 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// Answer a remote offer on a fresh connection and wait until it connects.
async fn negotiate(ws: &mut Client, events: &mut Vec<IpcEvent>) -> i64 {
    let connection = expect_handle(
        request(
            ws,
            10,
            Request::CreatePeerConnection(IpcCreatePeerConnectionRequest {}),
            events,
        )
        .await,
    );

    let response = request(
        ws,
        11,
        Request::SetRemoteDescription(IpcSetDescriptionRequest {
            connection,
            description: Some(RtcSessionDescription {
                sdp_type: RtcSdpType::Offer as i32,
                sdp: String::from(REMOTE_OFFER),
            }),
        }),
        events,
    )
    .await;
    assert!(matches!(response, Response::Ack(_)));

    let answer = match request(
        ws,
        12,
        Request::CreateAnswer(IpcPeerConnectionRequest { connection }),
        events,
    )
    .await
    {
        Response::SessionDescription(answer) => answer,
        other => panic!("Expected SessionDescription, got {:?}", other),
    };
    assert_eq!(answer.sdp_type, RtcSdpType::Answer as i32);

    let response = request(
        ws,
        13,
        Request::SetLocalDescription(IpcSetDescriptionRequest {
            connection,
            description: Some(answer),
        }),
        events,
    )
    .await;
    assert!(matches!(response, Response::Ack(_)));

    receive_events_until(ws, events, |events| {
        reached_state(events, connection, RtcPeerConnectionState::Connected)
    })
    .await;

    connection
}

#[tokio::test]
async fn given_valid_token_when_authenticating_then_success() {
    // GIVEN: A running server
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_to_server(server.port()).await;

    // WHEN: Authenticating with the configured token
    let response = authenticate(&mut ws, server.handle.auth_token()).await;

    // THEN: Accepted
    assert!(response.success, "Auth should succeed with valid token");
    assert!(response.error.is_none());

    server.handle.shutdown().await;
}

/// **VALUE**: A wrong token is answered with a failure and the connection is
/// dropped.
///
/// **WHY THIS MATTERS**: Any local process can reach the port.
///
/// **BUG THIS CATCHES**: Would catch the server accepting commands after a
/// failed handshake.
#[tokio::test]
async fn given_invalid_token_when_authenticating_then_rejected_and_closed() {
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_to_server(server.port()).await;

    let response = authenticate(&mut ws, "wrong-token").await;

    assert!(!response.success, "Auth should fail with invalid token");
    assert!(response.error.is_some());
    assert!(is_connection_closed(&mut ws).await);

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_command_before_auth_when_sent_then_connection_closed() {
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_to_server(server.port()).await;

    send_protobuf(
        &mut ws,
        &IpcClientMessage {
            request_id: 1,
            payload: Some(Request::CreatePeerConnection(
                IpcCreatePeerConnectionRequest {},
            )),
        },
    )
    .await;

    assert!(is_connection_closed(&mut ws).await);
    assert!(server.hooks.rtc.last_connection().is_none());

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_authenticated_client_when_authenticating_again_then_auth_error() {
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();

    let response = request(
        &mut ws,
        2,
        Request::AuthHandshake(IpcAuthHandshake {
            token: server.handle.auth_token().to_string(),
        }),
        &mut events,
    )
    .await;

    expect_error(response, IpcErrorCode::AuthError);

    server.handle.shutdown().await;
}

/// **VALUE**: A full answerer negotiation over the socket yields the
/// candidate and state events with the connection's handle.
///
/// **WHY THIS MATTERS**: This is the primary flow of the remote client.
///
/// **BUG THIS CATCHES**: Would catch events not reaching the socket, or
/// responses not echoing their request_id.
#[tokio::test]
async fn given_remote_offer_when_answered_over_ipc_then_connection_events_arrive() {
    // GIVEN: An authenticated client
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();

    // WHEN: Negotiating as the answerer
    let connection = negotiate(&mut ws, &mut events).await;

    // THEN: The first handle was issued and events arrived in order
    assert_eq!(connection, 0);
    let candidate_at = events
        .iter()
        .position(|e| matches!(&e.event, Some(ipc_event::Event::IceCandidate(c)) if c.connection == 0))
        .expect("No candidate event");
    let connected_at = events
        .iter()
        .position(|e| {
            matches!(
                &e.event,
                Some(ipc_event::Event::PeerConnectionState(s))
                    if s.state == RtcPeerConnectionState::Connected as i32
            )
        })
        .expect("No Connected event");
    assert!(candidate_at < connected_at);
    assert!(reached_state(&events, 0, RtcPeerConnectionState::Connecting));

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_open_data_channel_when_sending_over_ipc_then_echo_event_arrives() {
    // GIVEN: A connected peer connection with a local channel
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();
    let connection = negotiate(&mut ws, &mut events).await;
    let data_channel = expect_handle(
        request(
            &mut ws,
            20,
            Request::CreateDataChannel(IpcCreateDataChannelRequest {
                connection,
                label: String::from("chat"),
                init: None,
            }),
            &mut events,
        )
        .await,
    );

    // WHEN: Sending a text message through the loopback echo
    let response = request(
        &mut ws,
        21,
        Request::SendDataChannelMessage(IpcSendDataChannelMessageRequest {
            data_channel,
            buffer: Some(RtcDataBuffer {
                data: b"ping".to_vec(),
                is_binary: false,
            }),
        }),
        &mut events,
    )
    .await;
    assert!(matches!(response, Response::Ack(_)));

    // THEN: The echo comes back as a message event for that channel
    receive_events_until(&mut ws, &mut events, |events| {
        events.iter().any(|e| {
            matches!(&e.event, Some(ipc_event::Event::DataChannelMessage(m)) if m.data_channel == data_channel)
        })
    })
    .await;
    let echoed = events
        .iter()
        .find_map(|e| match &e.event {
            Some(ipc_event::Event::DataChannelMessage(m)) => m.buffer.clone(),
            _ => None,
        })
        .expect("No message event");
    assert_eq!(echoed.data, b"ping".to_vec());
    assert!(!echoed.is_binary);

    server.handle.shutdown().await;
}

/// **VALUE**: A request naming an unknown handle is answered with
/// PROTOCOL_VIOLATION and the connection is closed.
///
/// **WHY THIS MATTERS**: An unknown handle means the client's bookkeeping is
/// broken; continuing would act on the wrong resources.
///
/// **BUG THIS CATCHES**: Would catch the panic killing the server, or the
/// client never hearing why it was dropped.
#[tokio::test]
async fn given_unknown_handle_when_requested_then_protocol_violation_and_closed() {
    // GIVEN: An authenticated client
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();

    // WHEN: Sending on a channel that never existed
    let response = request(
        &mut ws,
        5,
        Request::SendDataChannelMessage(IpcSendDataChannelMessageRequest {
            data_channel: 99,
            buffer: None,
        }),
        &mut events,
    )
    .await;

    // THEN: Violation reported, then the connection is gone
    let message = expect_error(response, IpcErrorCode::ProtocolViolation);
    assert!(message.contains("No data channel with handle 99"));
    assert!(is_connection_closed(&mut ws).await);

    // AND: The server still accepts new clients
    let mut other = connect_authenticated(server.port()).await;
    let response = request(
        &mut other,
        2,
        Request::CreatePeerConnection(IpcCreatePeerConnectionRequest {}),
        &mut events,
    )
    .await;
    assert_eq!(expect_handle(response), 0);

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_malformed_frame_when_received_then_invalid_message_error() {
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;

    ws.send(tokio_tungstenite::tungstenite::Message::Binary(
        vec![0xff, 0xff, 0xff].into(),
    ))
    .await
    .expect("send failed");

    let response: IpcServerMessage = receive_protobuf(&mut ws).await;
    assert_eq!(response.request_id, 0);
    expect_error(
        response.payload.expect("No payload"),
        IpcErrorCode::InvalidMessage,
    );

    server.handle.shutdown().await;
}

/// **VALUE**: A native completion that never arrives becomes a TIMEOUT error.
///
/// **WHY THIS MATTERS**: Requests are served in order; one stuck completion
/// would otherwise block the client forever.
///
/// **BUG THIS CATCHES**: Would catch the request timeout not being applied.
#[tokio::test]
async fn given_held_completion_when_request_times_out_then_timeout_error() {
    // GIVEN: A short request timeout and a connection whose completions hang
    let server = start_test_server(ServerOptions {
        request_timeout: Duration::from_millis(200),
        dispose_on_disconnect: true,
    })
    .await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();
    let connection = expect_handle(
        request(
            &mut ws,
            2,
            Request::CreatePeerConnection(IpcCreatePeerConnectionRequest {}),
            &mut events,
        )
        .await,
    );
    let native = server.hooks.rtc.last_connection().expect("No connection");
    native.hold_completions(true);

    // WHEN: Creating an offer
    let response = request(
        &mut ws,
        3,
        Request::CreateOffer(IpcPeerConnectionRequest { connection }),
        &mut events,
    )
    .await;

    // THEN: Timed out, and the connection keeps serving requests
    expect_error(response, IpcErrorCode::Timeout);
    native.hold_completions(false);
    let response = request(
        &mut ws,
        4,
        Request::CreateOffer(IpcPeerConnectionRequest { connection }),
        &mut events,
    )
    .await;
    assert!(matches!(response, Response::SessionDescription(_)));

    server.handle.shutdown().await;
}

/// **VALUE**: When the last client disconnects its resources are disposed.
///
/// **WHY THIS MATTERS**: A crashed client must not leave the camera and
/// connections running.
///
/// **BUG THIS CATCHES**: Would catch disconnect cleanup being skipped.
#[tokio::test]
async fn given_client_resources_when_last_client_disconnects_then_disposed() {
    // GIVEN: A client that created a connection
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();
    let connection = expect_handle(
        request(
            &mut ws,
            2,
            Request::CreatePeerConnection(IpcCreatePeerConnectionRequest {}),
            &mut events,
        )
        .await,
    );
    let native = server.hooks.rtc.last_connection().expect("No connection");

    // WHEN: The client goes away
    ws.close(None).await.expect("close failed");
    drop(ws);

    // THEN: The connection is closed natively and unregistered
    let host = server.host.clone();
    assert!(eventually(|| native.close_calls() == 1).await);
    assert!(host.peer_connections().get(connection).is_none());

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_dispose_on_disconnect_off_when_client_leaves_then_resources_kept() {
    let server = start_test_server(ServerOptions {
        request_timeout: Duration::from_secs(2),
        dispose_on_disconnect: false,
    })
    .await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();
    let connection = expect_handle(
        request(
            &mut ws,
            2,
            Request::CreatePeerConnection(IpcCreatePeerConnectionRequest {}),
            &mut events,
        )
        .await,
    );

    ws.close(None).await.expect("close failed");
    drop(ws);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let native = server.hooks.rtc.last_connection().expect("No connection");
    assert_eq!(native.close_calls(), 0);
    assert!(server.host.peer_connections().get(connection).is_some());

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_ar_requests_when_sent_then_session_runs() {
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();

    let availability = request(
        &mut ws,
        2,
        Request::InitializeAr(IpcEmptyRequest {}),
        &mut events,
    )
    .await;
    match availability {
        Response::ArAvailability(a) => {
            assert_eq!(a.availability, ArAvailabilityKind::Available as i32)
        }
        other => panic!("Expected ArAvailability, got {:?}", other),
    }

    let session = expect_handle(
        request(
            &mut ws,
            3,
            Request::CreateArSession(IpcEmptyRequest {}),
            &mut events,
        )
        .await,
    );
    let response = request(
        &mut ws,
        4,
        Request::RunArSession(IpcArSessionRequest { session }),
        &mut events,
    )
    .await;

    assert!(matches!(response, Response::Ack(_)));
    let native = server.hooks.ar.last_session().expect("No AR session");
    assert!(native.is_running());

    server.handle.shutdown().await;
}

#[tokio::test]
async fn given_connected_gamepad_when_listing_then_handle_returned() {
    let TestServer {
        handle, hooks, ..
    } = start_test_server(ServerOptions::default()).await;
    hooks.gamepad.connect(1);
    let mut ws = connect_authenticated(handle.port()).await;
    let mut events = Vec::new();

    let response = request(
        &mut ws,
        2,
        Request::GetActiveGamepads(IpcEmptyRequest {}),
        &mut events,
    )
    .await;

    match response {
        Response::HandleList(list) => assert_eq!(list.handles.len(), 1),
        other => panic!("Expected HandleList, got {:?}", other),
    }

    handle.shutdown().await;
}

/// **VALUE**: Advertised devices reach the client both as an event and
/// through the cached device list.
///
/// **WHY THIS MATTERS**: The client shows nearby devices from either source
/// depending on when it attaches.
///
/// **BUG THIS CATCHES**: Would catch the product id or signal strength being
/// lost in the wire conversion.
#[tokio::test]
async fn given_scanning_when_device_advertises_then_listed_over_ipc() {
    // GIVEN: A scanning session
    let server = start_test_server(ServerOptions::default()).await;
    let mut ws = connect_authenticated(server.port()).await;
    let mut events = Vec::new();
    let scanner = expect_handle(
        request(
            &mut ws,
            2,
            Request::CreateScanner(IpcEmptyRequest {}),
            &mut events,
        )
        .await,
    );
    let response = request(
        &mut ws,
        3,
        Request::StartScanning(IpcScannerRequest { scanner }),
        &mut events,
    )
    .await;
    assert!(matches!(response, Response::Ack(_)));

    // WHEN: A device advertises
    let native = server.hooks.device_scan.last_scanner().expect("No scanner");
    native.advertise(DeviceAdvertisement {
        identifier: String::from("D-42"),
        name: String::from("Tracker"),
        product_id: NativeProductId::TrackE,
        green_mode: false,
        charging: true,
        drop_frame: false,
        battery_percent: 64,
        frame_rate: 25.0,
        icon: 1,
        rssi: -70,
        last_seen_secs: 12.0,
    });

    // THEN: An update event arrives and the cache lists the device
    receive_events_until(&mut ws, &mut events, |events| {
        events.iter().any(|e| {
            matches!(&e.event, Some(ipc_event::Event::DevicesUpdated(u)) if u.scanner == scanner)
        })
    })
    .await;
    let response = request(
        &mut ws,
        4,
        Request::GetCachedDevices(IpcScannerRequest { scanner }),
        &mut events,
    )
    .await;
    let devices = match response {
        Response::DeviceList(list) => list.devices,
        other => panic!("Expected DeviceList, got {:?}", other),
    };
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].identifier, "D-42");
    assert_eq!(devices[0].product_id, DeviceProductKind::TrackE as i32);
    assert_eq!(devices[0].signal_strength, -70);
    assert!(devices[0].is_charging);

    server.handle.shutdown().await;
}
