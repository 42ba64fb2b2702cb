//! CLI-owned configuration: TOML file + `AVYCON_*` environment, and
//! translation to `avycon_api::ClientConfig`.
//!
//! The library never sees these types; it receives a pre-built
//! `ClientConfig` plus the base URL and credentials.

use std::path::{Path, PathBuf};
use std::time::Duration;

use avycon_api::{ClientConfig, TlsMode};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Default search window for `records` when neither `--seconds` nor
/// `--start` is given.
pub const DEFAULT_CLIP_SECONDS: u64 = 120;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ── File / environment config ────────────────────────────────────────

/// Everything that can come from the config file or the environment.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// DVR base URL (e.g., "http://192.168.1.20").
    pub address: Option<String>,

    pub username: Option<String>,

    /// Plaintext password -- prefer `AVYCON_PASSWORD`.
    pub password: Option<String>,

    /// Default channel for `records`.
    pub channel_id: Option<String>,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Override the login `remote_terminal_info`.
    pub terminal_info: Option<String>,

    #[serde(default = "default_clip_seconds")]
    pub clip_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: None,
            username: None,
            password: None,
            channel_id: None,
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
            terminal_info: None,
            clip_seconds: default_clip_seconds(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_clip_seconds() -> u64 {
    DEFAULT_CLIP_SECONDS
}

/// Resolve the default config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "clipper").map_or_else(
        || PathBuf::from(".clipper").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Defaults, then the TOML file, then `AVYCON_*` and `CLIP_SECONDS`.
fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AVYCON_"))
        .merge(Env::raw().only(&["CLIP_SECONDS"]))
}

/// Load the config. An explicitly named file must exist; the default one
/// is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, CliError> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(CliError::NoConfig {
                path: path.display().to_string(),
            });
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };
    tracing::debug!(path = %path.display(), "loading config");
    Ok(figment(&path).extract()?)
}

// ── Resolution ───────────────────────────────────────────────────────

/// Connection settings with every source applied.
#[derive(Debug)]
pub struct Settings {
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    pub channel_id: Option<String>,
    pub clip_seconds: u64,
    pub client: ClientConfig,
}

/// Merge global flags over the loaded config. Flags win.
pub fn resolve(global: &GlobalOpts, config: Config) -> Result<Settings, CliError> {
    let address = global
        .address
        .clone()
        .or(config.address)
        .ok_or(CliError::MissingSetting {
            setting: "address",
            flag: "--address",
            env: "AVYCON_ADDRESS",
        })?;
    let base_url = Url::parse(&address).map_err(|e| CliError::Validation {
        field: "address".into(),
        reason: format!("invalid URL '{address}': {e}"),
    })?;

    let username = global
        .username
        .clone()
        .or(config.username)
        .ok_or(CliError::MissingSetting {
            setting: "username",
            flag: "--username",
            env: "AVYCON_USERNAME",
        })?;

    let password = global
        .password
        .clone()
        .or(config.password)
        .map(SecretString::from)
        .ok_or(CliError::MissingSetting {
            setting: "password",
            flag: "--password",
            env: "AVYCON_PASSWORD",
        })?;

    let tls = if global.insecure || config.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ca_path) = config.ca_cert {
        TlsMode::CustomCa(ca_path)
    } else {
        TlsMode::System
    };

    let mut client = ClientConfig {
        tls,
        ..ClientConfig::default()
    }
    .with_timeout(Duration::from_secs(global.timeout.unwrap_or(config.timeout)));
    if let Some(info) = config.terminal_info {
        client.terminal_info = info;
    }

    Ok(Settings {
        base_url,
        username,
        password,
        channel_id: config.channel_id,
        clip_seconds: config.clip_seconds,
        client,
    })
}
