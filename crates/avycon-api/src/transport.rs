// Transport configuration for the DVR connection.
//
// Holds TLS, timeout and identification settings and turns them into the
// `reqwest::Client` the session client opens on first use.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Terminal identifier the DVR's own web UI sends on login.
pub const DEFAULT_TERMINAL_INFO: &str = "WEB,firefox";

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (DVRs commonly ship self-signed ones).
    DangerAcceptInvalid,
}

/// Settings for the connection an [`AvyconClient`](crate::AvyconClient) opens.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tls: TlsMode,
    /// Overall per-request timeout. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Sent as `remote_terminal_info` in the login body.
    pub terminal_info: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: None,
            user_agent: concat!("clipper/", env!("CARGO_PKG_VERSION")).into(),
            terminal_info: DEFAULT_TERMINAL_INFO.into(),
        }
    }
}

impl ClientConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Cookies are managed by the session client itself, so no cookie
    /// store is attached.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.as_str());

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Accept self-signed certificates.
    pub fn insecure(mut self) -> Self {
        self.tls = TlsMode::DangerAcceptInvalid;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
