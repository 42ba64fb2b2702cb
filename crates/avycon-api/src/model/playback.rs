// ── Playback support payloads ──
//
// The DVR's private-key and playback-URL responses are passed through
// untouched by the client. These are optional typed views for callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// DASH playback endpoints from `/API/GetDashPlaybackUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackUrls {
    /// MPD manifest URL (path and query on the DVR).
    pub mpd: String,
    pub keepalive: String,
    pub stop: String,
}

impl PlaybackUrls {
    /// Read the URLs from the `data` object the client returns.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        Self::deserialize(value).map_err(|e| Error::validation("playback url", e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdKey {
    pub id: String,
    pub key: String,
}

/// Key material from `/API/Web/Get_Private_Key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeys {
    pub id_keys: Vec<IdKey>,
}

impl PrivateKeys {
    /// Read the keys from a response envelope, accepting them either at the
    /// top level or under `data`.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let inner = match value.get("data") {
            Some(data) if data.get("id_keys").is_some() => data,
            _ => value,
        };
        Self::deserialize(inner).map_err(|e| Error::validation("private key", e.to_string()))
    }
}
