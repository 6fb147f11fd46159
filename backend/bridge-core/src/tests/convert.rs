use crate::error::bridge::BridgeError;
use crate::error::native::NativeError;
use crate::ipc::convert::{
    data_buffer, data_channel_init, error_code, ice_candidate, session_description,
};
use crate::native::loopback::identity_transform;
use crate::proto::{
    IpcErrorCode, IpcEvent, IpcIceCandidateEvent, RtcDataChannelInit, RtcIceCandidate, RtcSdpType,
    RtcSessionDescription, ipc_event,
};

use common::ErrorLocation;
use models::BridgeEvent;
use models::ar::ArFrame;
use models::rtc::{DataChannelInit, IceCandidate, SessionDescriptionType};

use std::panic::Location;

fn sdp(sdp_type: i32) -> Option<RtcSessionDescription> {
    Some(RtcSessionDescription {
        sdp_type,
        sdp: String::from("v=0\r\n"),
    })
}

/// **VALUE**: Outbound events keep their handles and payload on the wire.
///
/// **WHY THIS MATTERS**: The client routes each event by its handle.
///
/// **BUG THIS CATCHES**: Would catch a field dropped during conversion.
#[test]
fn given_ice_candidate_event_when_converted_then_all_fields_present() {
    let event = BridgeEvent::IceCandidate {
        connection: 4,
        candidate: IceCandidate {
            candidate: String::from("candidate:1 1 udp 1 10.0.0.2 5000 typ host"),
            sdp_mid: String::from("audio"),
            sdp_mline_index: 1,
        },
    };

    let wire = IpcEvent::from(event);

    assert_eq!(
        wire.event,
        Some(ipc_event::Event::IceCandidate(IpcIceCandidateEvent {
            connection: 4,
            candidate: Some(RtcIceCandidate {
                candidate: Some(String::from("candidate:1 1 udp 1 10.0.0.2 5000 typ host")),
                sdp_mid: Some(String::from("audio")),
                sdp_mline_index: Some(1),
            }),
        }))
    );
}

#[test]
fn given_ar_frame_when_converted_then_transform_is_64_le_bytes() {
    let event = BridgeEvent::ArFrame {
        session: 0,
        frame: ArFrame {
            camera_transform: identity_transform(),
        },
    };

    let Some(ipc_event::Event::ArFrame(frame)) = IpcEvent::from(event).event else {
        panic!("Expected an AR frame event");
    };

    assert_eq!(frame.camera_transform.len(), 64);
    assert_eq!(&frame.camera_transform[0..4], &1.0f32.to_le_bytes());
    assert_eq!(&frame.camera_transform[4..8], &0.0f32.to_le_bytes());
}

/// **VALUE**: Session descriptions with an unknown type are rejected.
///
/// **WHY THIS MATTERS**: Passing an unset type to the native stack fails in
/// confusing ways.
///
/// **BUG THIS CATCHES**: Would catch Unspecified being defaulted to Offer.
#[test]
fn given_unspecified_sdp_type_when_converted_then_invalid_argument() {
    assert!(matches!(
        session_description(sdp(RtcSdpType::Unspecified as i32)),
        Err(BridgeError::InvalidArgument { .. })
    ));
    assert!(matches!(
        session_description(sdp(42)),
        Err(BridgeError::InvalidArgument { .. })
    ));
    assert!(matches!(
        session_description(None),
        Err(BridgeError::InvalidArgument { .. })
    ));

    let answer = session_description(sdp(RtcSdpType::Answer as i32)).expect("valid answer");
    assert_eq!(answer.sdp_type, SessionDescriptionType::Answer);
}

#[test]
fn given_candidate_without_line_when_converted_then_invalid_argument() {
    let result = ice_candidate(Some(RtcIceCandidate {
        candidate: None,
        sdp_mid: Some(String::from("0")),
        sdp_mline_index: Some(0),
    }));

    assert!(matches!(result, Err(BridgeError::InvalidArgument { .. })));
}

#[test]
fn given_candidate_with_negative_index_when_converted_then_invalid_argument() {
    let result = ice_candidate(Some(RtcIceCandidate {
        candidate: Some(String::from("candidate:1")),
        sdp_mid: None,
        sdp_mline_index: Some(-1),
    }));

    assert!(matches!(result, Err(BridgeError::InvalidArgument { .. })));
}

#[test]
fn given_missing_buffer_when_converted_then_empty_text_message() {
    let buffer = data_buffer(None);

    assert!(buffer.data.is_empty());
    assert!(!buffer.is_binary);
}

/// **VALUE**: Data channel options are range-checked and the two partial
/// reliability options are mutually exclusive.
///
/// **WHY THIS MATTERS**: SCTP only supports one reliability mode per channel
/// and 16-bit values.
///
/// **BUG THIS CATCHES**: Would catch silent truncation of large values.
#[test]
fn given_data_channel_init_when_converted_then_validated() {
    assert_eq!(data_channel_init(None).expect("defaults"), DataChannelInit::default());

    let unreliable = data_channel_init(Some(RtcDataChannelInit {
        ordered: false,
        max_retransmits: Some(0),
        max_packet_life_time_ms: None,
        protocol: String::from("telemetry"),
        negotiated_id: Some(3),
    }))
    .expect("valid init");
    assert_eq!(
        unreliable,
        DataChannelInit {
            ordered: false,
            max_retransmits: Some(0),
            max_packet_life_time_ms: None,
            protocol: String::from("telemetry"),
            negotiated_id: Some(3),
        }
    );

    let too_large = data_channel_init(Some(RtcDataChannelInit {
        ordered: true,
        max_retransmits: Some(70_000),
        max_packet_life_time_ms: None,
        protocol: String::new(),
        negotiated_id: None,
    }));
    assert!(matches!(too_large, Err(BridgeError::InvalidArgument { .. })));

    let both = data_channel_init(Some(RtcDataChannelInit {
        ordered: true,
        max_retransmits: Some(3),
        max_packet_life_time_ms: Some(500),
        protocol: String::new(),
        negotiated_id: None,
    }));
    assert!(matches!(both, Err(BridgeError::InvalidArgument { .. })));
}

#[test]
fn given_bridge_errors_when_mapped_then_wire_codes_match() {
    let location = ErrorLocation::from(Location::caller());
    let native = BridgeError::from(NativeError::Operation {
        message: String::from("refused"),
        location,
    });
    let abandoned = BridgeError::Abandoned {
        message: String::from("dropped"),
        location,
    };
    let disposed = BridgeError::Disposed {
        message: String::from("gone"),
        location,
    };
    let timeout = BridgeError::Timeout {
        message: String::from("slow"),
        location,
    };

    assert_eq!(error_code(&native), IpcErrorCode::NativeError);
    assert_eq!(error_code(&abandoned), IpcErrorCode::NativeError);
    assert_eq!(error_code(&disposed), IpcErrorCode::Disposed);
    assert_eq!(error_code(&timeout), IpcErrorCode::Timeout);
}
