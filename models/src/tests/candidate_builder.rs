use crate::ModelError;
use crate::rtc::IceCandidateBuilder;

/// **VALUE**: Verifies that a complete wire candidate builds into a native-ready candidate.
///
/// **WHY THIS MATTERS**: `add_remote_candidate` converts the wire form (i64 m-line index) before
/// handing it to the native stack. A conversion bug silently drops connectivity.
///
/// **BUG THIS CATCHES**: Would catch if fields are swapped or the index is truncated.
#[test]
fn given_complete_candidate_when_building_then_returns_candidate() {
    // GIVEN: Builder with all fields
    let builder = IceCandidateBuilder::default()
        .with_candidate("candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host")
        .with_sdp_mid("0")
        .with_sdp_mline_index(1);

    // WHEN: Building
    let candidate = builder.build().expect("candidate should build");

    // THEN: Fields are carried over
    assert_eq!(candidate.sdp_mid, "0");
    assert_eq!(candidate.sdp_mline_index, 1);
    assert!(candidate.candidate.starts_with("candidate:1"));
}

/// **VALUE**: Verifies that negative m-line indices are rejected.
///
/// **WHY THIS MATTERS**: The wire carries a signed integer; a negative index cast blindly to
/// `u16` would address a bogus media section.
///
/// **BUG THIS CATCHES**: Would catch an `as u16` cast replacing the checked conversion.
#[test]
fn given_negative_mline_index_when_building_then_returns_validation_error() {
    // GIVEN: Builder with an out-of-range index
    let builder = IceCandidateBuilder::default()
        .with_candidate("candidate:1 1 udp 1 10.0.0.2 50000 typ host")
        .with_sdp_mline_index(-3);

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error mentions the index
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.contains("-3"), "message was {message}");
        }
        Ok(candidate) => panic!("Expected validation error, got {candidate:?}"),
    }
}

/// **VALUE**: Verifies that an empty candidate line is rejected.
///
/// **BUG THIS CATCHES**: Would catch if the end-of-candidates marker is forwarded as a real
/// candidate to the native stack.
#[test]
fn given_empty_candidate_when_building_then_returns_validation_error() {
    // GIVEN: Builder with empty candidate
    let builder = IceCandidateBuilder::default().with_candidate("");

    // WHEN / THEN: Building fails
    assert!(builder.build().is_err());
}
