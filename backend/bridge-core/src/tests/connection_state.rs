use crate::ipc::connection_state::ConnectionState;

/// **VALUE**: Only the exact token authenticates a connection.
///
/// **WHY THIS MATTERS**: Any local process can reach the port; the token is
/// the only thing keeping it from driving the camera and radio.
///
/// **BUG THIS CATCHES**: Would catch prefix matches or empty tokens being
/// accepted.
#[test]
fn given_expected_token_when_validating_then_only_exact_match_authenticates() {
    // GIVEN: A fresh connection
    let mut state = ConnectionState::new(String::from("s3cret-token"));
    assert!(!state.is_authenticated());

    // WHEN/THEN: Near misses are rejected
    assert!(!state.validate_token(""));
    assert!(!state.validate_token("s3cret"));
    assert!(!state.validate_token("s3cret-token-extra"));
    assert!(!state.validate_token("S3CRET-TOKEN"));
    assert!(!state.is_authenticated());

    // WHEN/THEN: The exact token is accepted
    assert!(state.validate_token("s3cret-token"));
    assert!(state.is_authenticated());
}

#[test]
fn given_authenticated_connection_when_wrong_token_later_then_stays_authenticated() {
    let mut state = ConnectionState::new(String::from("token"));
    state.validate_token("token");

    assert!(!state.validate_token("other"));
    assert!(state.is_authenticated());
}
