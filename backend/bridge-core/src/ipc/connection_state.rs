//! Per-connection authentication state.

/// Whether a client proved it knows the server token.
///
/// The first message of every connection must be an auth handshake; nothing
/// else is routed until [`validate_token`](Self::validate_token) succeeded.
pub(crate) struct ConnectionState {
    authenticated: bool,
    expected_token: String,
}

impl ConnectionState {
    pub(crate) fn new(token: String) -> Self {
        Self {
            authenticated: false,
            expected_token: token,
        }
    }

    /// Compare `token` against the expected one. Success is sticky; a later
    /// wrong token does not revoke it.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        let matches = token.len() == self.expected_token.len()
            && token
                .bytes()
                .zip(self.expected_token.bytes())
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0;
        self.authenticated |= matches;
        matches
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
