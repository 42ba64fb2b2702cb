// Session state snapshot
//
// The session is never mutated in place. A successful handshake builds a
// whole new `SessionState` from the login response and the client swaps it
// in atomically, so readers see either the old session or the new one.

use std::fmt;

use crate::auth::Credentials;

/// Name of the cookie carrying the DVR session id.
pub const SESSION_COOKIE: &str = "session";

/// Header carrying the anti-CSRF token, both in the login response and on
/// every later request.
pub const CSRF_HEADER: &str = "X-csrftoken";

/// What a successful login hands back.
#[derive(Clone)]
pub(crate) struct SessionGrant {
    pub cookie: Option<String>,
    pub csrf_token: Option<String>,
    pub credentials: Credentials,
}

/// Immutable view of the authentication state of one client.
#[derive(Clone)]
pub struct SessionState {
    cookie: Option<String>,
    csrf_token: Option<String>,
    nonce_count: u32,
    credentials: Option<Credentials>,
}

impl SessionState {
    /// The empty pre-login state. The Digest nonce count starts at 1.
    pub(crate) fn new() -> Self {
        Self {
            cookie: None,
            csrf_token: None,
            nonce_count: 1,
            credentials: None,
        }
    }

    /// The state after a completed handshake: everything comes from the
    /// grant, and the nonce count moves forward by exactly one.
    pub(crate) fn established(&self, grant: SessionGrant) -> Self {
        Self {
            cookie: grant.cookie,
            csrf_token: grant.csrf_token,
            nonce_count: self.nonce_count.saturating_add(1),
            credentials: Some(grant.credentials),
        }
    }

    /// The state after close: session data dropped, nonce count kept.
    pub(crate) fn cleared(&self) -> Self {
        Self {
            nonce_count: self.nonce_count,
            ..Self::new()
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// The `nc` value the next handshake will send.
    pub fn nonce_count(&self) -> u32 {
        self.nonce_count
    }

    /// Credentials of the last successful login.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// `Cookie` header value for the session, e.g. `session=abc123`.
    pub fn cookie_header(&self) -> Option<String> {
        self.cookie
            .as_deref()
            .map(|value| format!("{SESSION_COOKIE}={value}"))
    }
}

// Cookie and token are bearer secrets; show only whether they are set.
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("cookie", &self.cookie.as_ref().map(|_| "[REDACTED]"))
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "[REDACTED]"))
            .field("nonce_count", &self.nonce_count)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("cookie", &self.cookie.is_some())
            .field("csrf_token", &self.csrf_token.is_some())
            .finish_non_exhaustive()
    }
}
