// avycon-api: Async Rust client for the AVYCON DVR web API (Digest login + session)

pub mod auth;
pub mod client;
mod endpoints;
pub mod envelope;
pub mod error;
pub mod model;
pub mod session;
pub mod transport;

pub use auth::{Challenge, Credentials, DigestHandshake, Qop};
pub use client::AvyconClient;
pub use envelope::{ErrorEnvelope, ResponseBody};
pub use error::{Error, error_code_message};
pub use model::{Channel, ConnectStatus, PlaybackUrls, PrivateKeys, SearchRecord};
pub use session::SessionState;
pub use transport::{ClientConfig, TlsMode};
