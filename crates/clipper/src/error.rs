//! CLI error types with miette diagnostics.
//!
//! Maps `avycon_api::Error` variants into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const API: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the DVR at {url}")]
    #[diagnostic(
        code(clipper::connection_failed),
        help(
            "Check that the DVR is powered on and reachable.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(clipper::tls_error),
        help(
            "DVRs usually ship self-signed certificates.\n\
             Use --insecure (-k), or set ca_cert in the config file."
        )
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login rejected (HTTP {status})")]
    #[diagnostic(
        code(clipper::auth_failed),
        help("Verify AVYCON_USERNAME and AVYCON_PASSWORD (or --username / --password).")
    )]
    AuthFailed { status: u16, body: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(clipper::not_found),
        help("Run: clipper {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("DVR error (HTTP {status}): {message}")]
    #[diagnostic(code(clipper::api_error))]
    Api { status: u16, message: String },

    #[error("The DVR's playback stream is held by another client")]
    #[diagnostic(
        code(clipper::busy),
        help("Close other playback sessions (web UI, apps) or retry in a few seconds.")
    )]
    Busy,

    #[error("Unexpected response from the DVR: {message}")]
    #[diagnostic(code(clipper::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(clipper::validation))]
    Validation { field: String, reason: String },

    #[error("No {setting} configured")]
    #[diagnostic(
        code(clipper::missing_setting),
        help("Pass {flag}, set {env}, or add {setting} to the config file.")
    )]
    MissingSetting {
        setting: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found")]
    #[diagnostic(code(clipper::no_config), help("Expected at: {path}"))]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(clipper::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(clipper::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(clipper::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Api { .. } | Self::Busy => exit_code::API,
            Self::Validation { .. } | Self::MissingSetting { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── avycon_api::Error → CliError mapping ─────────────────────────────

impl From<avycon_api::Error> for CliError {
    fn from(err: avycon_api::Error) -> Self {
        use avycon_api::Error as ApiError;

        if err.is_busy() {
            return Self::Busy;
        }
        match err {
            ApiError::Authentication { status, body } => Self::AuthFailed { status, body },
            ApiError::Api {
                status,
                body,
                message,
            } => Self::Api {
                status,
                message: message.unwrap_or_else(|| body.to_string()),
            },
            ApiError::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), |u| u.origin().ascii_serialization()),
                source: Box::new(e),
            },
            ApiError::Tls(message) => Self::TlsError { message },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "address".into(),
                reason: e.to_string(),
            },
            ApiError::Validation { entity, message } => Self::Protocol {
                message: format!("invalid {entity}: {message}"),
            },
            other => Self::Protocol {
                message: other.to_string(),
            },
        }
    }
}
