// ── Channel domain type ──

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Prefix of channel ids (`CH1`, `CH2`, ...).
const CHANNEL_ID_PREFIX: &str = "CH";

/// Connection status of a camera input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[non_exhaustive]
pub enum ConnectStatus {
    Online,
    Offline,
    NotConfigured,
    #[serde(other)]
    Unknown,
}

impl ConnectStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Wire shape of one entry of `channel_param.items`.
#[derive(Deserialize)]
struct ChannelPayload {
    channel: String,
    connect_status: ConnectStatus,
    channel_name: String,
    channel_alias: String,
    #[serde(default)]
    ability: Option<Vec<String>>,
    #[serde(default)]
    intelligent_ability: Option<Vec<String>>,
    #[serde(default)]
    alarm_in_num: Option<u32>,
    #[serde(default)]
    alarm_out_num: Option<u32>,
    #[serde(default)]
    videoloss: Option<bool>,
}

/// One camera input line on the DVR.
///
/// `id` is opaque. Only [`number`](Self::number) looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: String,
    pub status: ConnectStatus,
    pub name: String,
    pub alias: String,
    pub abilities: IndexSet<String>,
    pub intelligent_abilities: IndexSet<String>,
    pub alarm_in_count: u32,
    pub alarm_out_count: u32,
    pub video_loss: bool,
}

impl Channel {
    /// Build a channel from one decoded `channel_param.items` entry.
    ///
    /// `channel`, `connect_status`, `channel_name` and `channel_alias` are
    /// required; missing capability lists become empty sets, missing
    /// counts zero, a missing `videoloss` false.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let payload = ChannelPayload::deserialize(value)
            .map_err(|e| Error::validation("channel", e.to_string()))?;
        Ok(Self::from_payload(payload))
    }

    /// The numeric part of a `CH<n>` id, for APIs that want a number.
    pub fn number(&self) -> Option<u32> {
        self.id.strip_prefix(CHANNEL_ID_PREFIX)?.parse().ok()
    }

    /// Path of the channel's live HLS stream on the DVR.
    pub fn hls_live_path(&self) -> String {
        format!("/hls/live/{}/1/livetop.mp4", self.id)
    }

    fn from_payload(p: ChannelPayload) -> Self {
        Self {
            id: p.channel,
            status: p.connect_status,
            name: p.channel_name,
            alias: p.channel_alias,
            abilities: p.ability.unwrap_or_default().into_iter().collect(),
            intelligent_abilities: p
                .intelligent_ability
                .unwrap_or_default()
                .into_iter()
                .collect(),
            alarm_in_count: p.alarm_in_num.unwrap_or_default(),
            alarm_out_count: p.alarm_out_num.unwrap_or_default(),
            video_loss: p.videoloss.unwrap_or_default(),
        }
    }
}

impl TryFrom<&Value> for Channel {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}
