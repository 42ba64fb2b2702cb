use thiserror::Error;

use crate::envelope::ResponseBody;

/// The `reason` the DVR reports while another client holds the playback stream.
pub const REASON_PLAYBACK_MUTEX: &str = "playback_mutex";

/// Top-level error type for the `avycon-api` crate.
///
/// [`Error::Api`] is the only variant carrying protocol context (status,
/// body, derived message). Everything else is a generic failure kind.
/// Nothing in this crate retries on any of these.
#[derive(Debug, Error)]
pub enum Error {
    // ── Protocol ────────────────────────────────────────────────────
    /// The server answered with a shape the client cannot work with
    /// (missing challenge header, unexpected content type, missing `data`).
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The DVR rejected the Digest login.
    #[error("Authentication failed (HTTP {status}): {body}")]
    Authentication { status: u16, body: String },

    // ── API ─────────────────────────────────────────────────────────
    /// A well-formed error response from the DVR.
    #[error(
        "AVYCON API error (HTTP {status}): {} ({body})",
        .message.as_deref().unwrap_or("no message")
    )]
    Api {
        status: u16,
        body: ResponseBody,
        /// Looked up from the envelope's `error_code`, if the code is known.
        message: Option<String>,
    },

    // ── Misuse ──────────────────────────────────────────────────────
    /// A request was issued before the connection was opened (or after close).
    #[error("Client not initialized: {0}")]
    State(&'static str),

    // ── Data ────────────────────────────────────────────────────────
    /// A decoded payload did not match the expected domain shape.
    #[error("Invalid {entity} payload: {message}")]
    Validation {
        entity: &'static str,
        message: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity,
            message: message.into(),
        }
    }

    /// Build an [`Error::Api`] from a status and body, deriving the message
    /// from the body's `error_code`.
    pub fn api(status: u16, body: ResponseBody) -> Self {
        let message = body
            .error_code()
            .and_then(error_code_message)
            .map(String::from);
        Self::Api {
            status,
            body,
            message,
        }
    }

    /// Returns `true` if the DVR refused because the playback stream is
    /// held by someone else. Callers may retry these after a delay.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Api { body, .. } => body.reason() == Some(REASON_PLAYBACK_MUTEX),
            _ => false,
        }
    }

    /// Returns `true` if the session was rejected and logging in again
    /// might resolve it. A busy refusal is not an auth failure even though
    /// the DVR answers it with 401.
    pub fn is_auth_failure(&self) -> bool {
        !self.is_busy()
            && matches!(
                self,
                Self::Authentication { .. } | Self::Api { status: 401, .. }
            )
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Map a vendor `error_code` to a human-readable message.
///
/// The entries are placeholders: the codes are plausible names that have
/// not been confirmed against firmware. Codes not listed here return `None`
/// and stay visible through the raw body of [`Error::Api`].
pub fn error_code_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "param_error" => "Request parameters are invalid",
        "no_permission" => "The account lacks permission for this operation",
        "not_login" => "Not logged in",
        "session_timeout" => "The session has timed out; log in again",
        "user_locked" => "The account is locked after too many failed logins",
        "user_or_password_error" => "Incorrect username or password",
        "user_not_exist" => "The user does not exist",
        "device_busy" => "The device is busy; try again later",
        "disk_not_exist" => "No storage disk is installed",
        "channel_offline" => "The requested channel is offline",
        "search_no_result" => "No recordings match the search",
        "unsupported_function" => "The device does not support this function",
        "token_invalid" => "The CSRF token is missing or invalid",
        _ => return None,
    };
    Some(message)
}
