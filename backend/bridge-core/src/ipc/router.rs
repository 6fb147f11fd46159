//! Maps one authenticated client request onto the host subsystems.

use crate::error::bridge::BridgeError;
use crate::host::BridgeHost;
use crate::ipc::convert;
use crate::proto::{
    ArAvailabilityKind, IpcAck, IpcArAvailabilityResponse, IpcDeviceListResponse,
    IpcHandleListResponse, IpcHandleResponse, RtcSessionDescription, RtcStatsReport, ScanDevice,
    ipc_client_message, ipc_server_message,
};

use common::ErrorLocation;
use models::Handle;

use std::future::Future;
use std::panic::Location;
use std::time::Duration;

use log::debug;

type Request = ipc_client_message::Payload;
type Response = ipc_server_message::Payload;

fn ack() -> Response {
    Response::Ack(IpcAck {})
}

fn handle(handle: Handle) -> Response {
    Response::Handle(IpcHandleResponse { handle })
}

/// Await a native-backed command, failing with [`BridgeError::Timeout`] once
/// `timeout` elapses. The in-flight completion is dropped unanswered.
async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    command: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(timeout, command).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Timeout {
            message: format!(
                "{operation} did not complete within {} ms",
                timeout.as_millis()
            ),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Execute `request` and build its response payload.
///
/// # Errors
///
/// Returns the [`BridgeError`] of the failed command. Unknown handles are
/// programming errors on the client side and panic inside the subsystem.
pub(crate) async fn handle_request(
    host: &BridgeHost,
    request: Request,
    timeout: Duration,
) -> Result<Response, BridgeError> {
    let connections = host.peer_connections();

    match request {
        Request::AuthHandshake(_) => Err(BridgeError::InvalidArgument {
            message: "Auth handshake already completed".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),

        // Peer connections
        Request::SetFieldTrials(req) => {
            connections.set_field_trials(req.field_trials);
            Ok(ack())
        }
        Request::CreatePeerConnection(_) => Ok(handle(connections.create())),
        Request::DisposePeerConnection(req) => {
            connections.dispose(req.connection);
            Ok(ack())
        }
        Request::SetRemoteDescription(req) => {
            let description = convert::session_description(req.description)?;
            bounded(
                "set_remote_description",
                timeout,
                connections.set_remote_description(req.connection, description),
            )
            .await?;
            Ok(ack())
        }
        Request::SetLocalDescription(req) => {
            let description = convert::session_description(req.description)?;
            bounded(
                "set_local_description",
                timeout,
                connections.set_local_description(req.connection, description),
            )
            .await?;
            Ok(ack())
        }
        Request::AddRemoteCandidate(req) => {
            let candidate = convert::ice_candidate(req.candidate)?;
            bounded(
                "add_remote_candidate",
                timeout,
                connections.add_remote_candidate(req.connection, candidate),
            )
            .await?;
            Ok(ack())
        }
        Request::CreateAnswer(req) => {
            let answer =
                bounded("create_answer", timeout, connections.create_answer(req.connection))
                    .await?;
            Ok(Response::SessionDescription(RtcSessionDescription::from(answer)))
        }
        Request::CreateOffer(req) => {
            let offer =
                bounded("create_offer", timeout, connections.create_offer(req.connection)).await?;
            Ok(Response::SessionDescription(RtcSessionDescription::from(offer)))
        }
        Request::GetStats(req) => {
            let type_filter = req.filter_types.then_some(req.type_filter);
            let report = bounded(
                "get_stats",
                timeout,
                connections.get_stats(req.connection, type_filter),
            )
            .await?;
            Ok(Response::StatsReport(RtcStatsReport::from(report)))
        }
        Request::CreateDataChannel(req) => {
            let init = convert::data_channel_init(req.init)?;
            let data_channel = connections.create_data_channel(req.connection, &req.label, &init)?;
            Ok(handle(data_channel))
        }

        // Data channels
        Request::SendDataChannelMessage(req) => {
            let buffer = convert::data_buffer(req.buffer);
            host.data_channels().send(req.data_channel, &buffer);
            Ok(ack())
        }
        Request::DisposeDataChannel(req) => {
            host.data_channels().dispose(req.data_channel);
            Ok(ack())
        }

        // Video views
        Request::CreateVideoView(_) => Ok(handle(host.video_views().create())),
        Request::SetVideoTrack(req) => {
            host.video_views().set_track(req.controller, req.track)?;
            Ok(ack())
        }
        Request::DisposeVideoView(req) => {
            host.video_views().dispose(req.controller);
            Ok(ack())
        }

        // AR
        Request::InitializeAr(_) => {
            let availability = host.ar_sessions().initialize();
            Ok(Response::ArAvailability(IpcArAvailabilityResponse {
                availability: ArAvailabilityKind::from(availability) as i32,
            }))
        }
        Request::CreateArSession(_) => Ok(handle(host.ar_sessions().create())),
        Request::RunArSession(req) => {
            host.ar_sessions().run(req.session);
            Ok(ack())
        }
        Request::PauseArSession(req) => {
            host.ar_sessions().pause(req.session);
            Ok(ack())
        }
        Request::DisposeArSession(req) => {
            host.ar_sessions().dispose(req.session);
            Ok(ack())
        }

        // Gamepads
        Request::GetActiveGamepads(_) => Ok(Response::HandleList(IpcHandleListResponse {
            handles: host.gamepads().active_gamepads(),
        })),

        // Device scanning
        Request::CreateScanner(_) => Ok(handle(host.device_scan().create())),
        Request::StartScanning(req) => {
            host.device_scan().start_scanning(req.scanner);
            Ok(ack())
        }
        Request::StopScanning(req) => {
            host.device_scan().stop_scanning(req.scanner);
            Ok(ack())
        }
        Request::GetCachedDevices(req) => {
            let devices = host.device_scan().cached_devices(req.scanner);
            debug!("Scanner #{} has {} cached device(s)", req.scanner, devices.len());
            Ok(Response::DeviceList(IpcDeviceListResponse {
                devices: devices.into_iter().map(ScanDevice::from).collect(),
            }))
        }
        Request::DisposeScanner(req) => {
            host.device_scan().dispose(req.scanner);
            Ok(ack())
        }
    }
}
