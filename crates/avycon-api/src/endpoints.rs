// DVR endpoint wrappers
//
// Thin typed layer over `AvyconClient::request`. Every call is a POST under
// `/API/`; the envelope comes back already checked for failure.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::AvyconClient;
use crate::error::Error;
use crate::model::{Channel, SearchRecord, split_timestamp};

const LOGOUT_PATH: &str = "/API/Web/Logout";
const HEARTBEAT_PATH: &str = "/API/Login/Heartbeat";
const CHANNEL_INFO_PATH: &str = "/API/Login/ChannelInfo/Get";
const SEARCH_RECORD_PATH: &str = "/API/Playback/SearchRecord/Search";
const PRIVATE_KEY_PATH: &str = "/API/Web/Get_Private_Key";
const PLAYBACK_URL_PATH: &str = "/API/GetDashPlaybackUrl";

/// Protocol version string the DVR expects in request envelopes.
const API_VERSION: &str = "1.0";

/// Record type filter for continuous ("normal") recordings.
const RECORD_TYPE_NORMAL: u32 = 1;

const SEARCH_STREAM_MODE: &str = "Substream";

impl AvyconClient {
    /// End the session on the DVR.
    ///
    /// `POST /API/Web/Logout`. Does not close the local connection; call
    /// [`close`](Self::close) for that.
    pub async fn logout(&self) -> Result<Value, Error> {
        debug!("logging out");
        self.post(
            LOGOUT_PATH,
            Some(&json!({ "data": {}, "version": API_VERSION })),
        )
        .await
    }

    /// Keep the session alive.
    ///
    /// `POST /API/Login/Heartbeat` with `actionType: create`.
    pub async fn heartbeat(&self) -> Result<Value, Error> {
        debug!("sending heartbeat");
        self.post(
            HEARTBEAT_PATH,
            Some(&json!({
                "actionType": "create",
                "data": {},
                "version": API_VERSION,
            })),
        )
        .await
    }

    /// Raw channel configuration.
    ///
    /// `POST /API/Login/ChannelInfo/Get`, returns the envelope's `data`.
    pub async fn channel_info(&self) -> Result<Value, Error> {
        debug!("fetching channel info");
        let envelope = self.post(CHANNEL_INFO_PATH, None).await?;
        take_data(envelope)
    }

    /// All channels configured on the DVR, in the DVR's order.
    pub async fn fetch_channels(&self) -> Result<Vec<Arc<Channel>>, Error> {
        let data = self.channel_info().await?;
        let items = data
            .pointer("/channel_param/items")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::validation("channel", "missing channel_param.items"))?;
        items
            .iter()
            .map(|item| Channel::from_value(item).map(Arc::new))
            .collect()
    }

    /// Search recordings on the given channel ids between `start` and `end`
    /// (DVR local time), returning the raw record entries.
    ///
    /// `POST /API/Playback/SearchRecord/Search`
    pub async fn search_records_raw(
        &self,
        channel_ids: &[&str],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Value>, Error> {
        debug!(?channel_ids, %start, %end, "searching records");
        let envelope = self
            .post(SEARCH_RECORD_PATH, Some(&search_body(channel_ids, start, end)))
            .await?;
        let data = take_data(envelope)?;
        first_record_group(data)
    }

    /// Search recordings on `channels` and resolve each result against them.
    pub async fn search_records(
        &self,
        channels: &[Arc<Channel>],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<SearchRecord>, Error> {
        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        self.search_records_raw(&ids, start, end)
            .await?
            .iter()
            .map(|raw| SearchRecord::from_value(raw, channels))
            .collect()
    }

    /// The DVR's playback key material, as the full envelope.
    ///
    /// `POST /API/Web/Get_Private_Key` with `{"number": 1}`. See
    /// [`PrivateKeys`](crate::model::PrivateKeys) for a typed view.
    pub async fn private_key(&self) -> Result<Value, Error> {
        debug!("fetching private key");
        self.post(PRIVATE_KEY_PATH, Some(&json!({ "number": 1 })))
            .await
    }

    /// DASH playback URLs for a new playback session.
    ///
    /// `POST /API/GetDashPlaybackUrl?<unix millis>=`, returns `data`. See
    /// [`PlaybackUrls`](crate::model::PlaybackUrls) for a typed view.
    pub async fn playback_url(&self) -> Result<Value, Error> {
        let path = format!(
            "{PLAYBACK_URL_PATH}?{}=",
            Utc::now().timestamp_millis()
        );
        debug!("fetching playback url");
        let envelope = self.post(&path, None).await?;
        take_data(envelope)
    }
}

/// Request body for a record search.
pub(crate) fn search_body(channel_ids: &[&str], start: NaiveDateTime, end: NaiveDateTime) -> Value {
    let (start_date, start_time) = split_timestamp(start);
    let (end_date, end_time) = split_timestamp(end);
    json!({
        "version": API_VERSION,
        "data": {
            "channel": channel_ids,
            "enable_smart_search": 0,
            "record_type": RECORD_TYPE_NORMAL,
            "smart_region": [],
            "stream_mode": SEARCH_STREAM_MODE,
            "start_date": start_date,
            "start_time": start_time,
            "end_date": end_date,
            "end_time": end_time,
        },
    })
}

/// Move `data` out of a success envelope.
fn take_data(mut envelope: Value) -> Result<Value, Error> {
    envelope
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| Error::protocol("response envelope has no data"))
}

/// The DVR groups search results as `record: [[...]]`; only the first group
/// is populated. An empty `record` array means no results.
fn first_record_group(mut data: Value) -> Result<Vec<Value>, Error> {
    let groups = data
        .get_mut("record")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| Error::validation("search record", "missing record array"))?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    match groups.swap_remove(0) {
        Value::Array(records) => Ok(records),
        other => Err(Error::validation(
            "search record",
            format!("expected an array of records, got {other}"),
        )),
    }
}
