// ── Recorded-video search results ──
//
// The DVR reports timestamps as separate date and time strings in its own
// local clock, with no offset. They are kept as naive local times; results
// are only meaningful when the caller and the DVR share a timezone.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel::Channel;
use crate::error::Error;

/// Date format of search filters and results (`01/02/2024`).
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Time format of search filters and results (`03:04:05`).
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Deserialize)]
struct SearchRecordPayload {
    record_id: u64,
    channel: String,
    start_date: String,
    start_time: String,
    end_date: String,
    end_time: String,
    disk_event_id: u64,
    size: u64,
    record_type: u32,
    stream_mode: String,
}

/// One indexed segment of recorded video.
///
/// `start <= end` is whatever the DVR says; it is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRecord {
    pub id: u64,
    pub channel_id: String,
    /// The channel this record belongs to, shared with the caller's list.
    pub channel: Arc<Channel>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// `None` when the DVR reports event id 0.
    pub event_id: Option<u64>,
    /// Size in bytes.
    pub size: u64,
    pub record_type: u32,
    pub stream_mode: String,
}

impl SearchRecord {
    /// Build a record from one entry of the search result array, resolving
    /// its channel by exact id among `channels`.
    ///
    /// A record naming a channel that is not in `channels` is rejected:
    /// the caller searched channels it did not pass in, or the DVR
    /// answered for ones it was not asked about.
    pub fn from_value(value: &Value, channels: &[Arc<Channel>]) -> Result<Self, Error> {
        let p = SearchRecordPayload::deserialize(value)
            .map_err(|e| Error::validation("search record", e.to_string()))?;

        let channel = channels
            .iter()
            .find(|c| c.id == p.channel)
            .cloned()
            .ok_or_else(|| {
                Error::validation(
                    "search record",
                    format!(
                        "record {} references channel {:?} which was not searched",
                        p.record_id, p.channel
                    ),
                )
            })?;

        Ok(Self {
            id: p.record_id,
            start: parse_timestamp(&p.start_date, &p.start_time)?,
            end: parse_timestamp(&p.end_date, &p.end_time)?,
            channel_id: p.channel,
            channel,
            event_id: (p.disk_event_id != 0).then_some(p.disk_event_id),
            size: p.size,
            record_type: p.record_type,
            stream_mode: p.stream_mode,
        })
    }
}

/// Combine a `MM/DD/YYYY` date and `HH:MM:SS` time.
fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime, Error> {
    let d = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| Error::validation("search record", format!("bad date {date:?}: {e}")))?;
    let t = NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|e| Error::validation("search record", format!("bad time {time:?}: {e}")))?;
    Ok(d.and_time(t))
}

/// Split a timestamp into the DVR's date and time filter strings.
pub fn split_timestamp(ts: NaiveDateTime) -> (String, String) {
    (
        ts.format(DATE_FORMAT).to_string(),
        ts.format(TIME_FORMAT).to_string(),
    )
}
