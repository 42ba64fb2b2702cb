//! Recording search handlers.

use avycon_api::{AvyconClient, SearchRecord};
use chrono::{Local, NaiveDateTime, TimeDelta};
use tabled::Tabled;

use crate::cli::{GlobalOpts, RecordsArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::channels::resolve_channel;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Size")]
    size: u64,
}

impl From<&SearchRecord> for RecordRow {
    fn from(r: &SearchRecord) -> Self {
        Self {
            id: r.id,
            channel: r.channel.name.clone(),
            start: r.start.format(TIMESTAMP_FORMAT).to_string(),
            end: r.end.format(TIMESTAMP_FORMAT).to_string(),
            event: r.event_id.map(|e| e.to_string()).unwrap_or_default(),
            size: r.size,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &AvyconClient,
    args: RecordsArgs,
    global: &GlobalOpts,
    settings: &Settings,
) -> Result<(), CliError> {
    let channel_id = args
        .channel
        .clone()
        .or_else(|| settings.channel_id.clone())
        .ok_or(CliError::MissingSetting {
            setting: "channel_id",
            flag: "--channel",
            env: "AVYCON_CHANNEL_ID",
        })?;
    let (start, end) = search_window(&args, settings.clip_seconds, Local::now().naive_local())?;

    let channels = client.fetch_channels().await?;
    let channel = resolve_channel(&channels, &channel_id)?;

    tracing::debug!(channel = %channel.id, %start, %end, "searching records");
    let records = client.search_records(&[channel], start, end).await?;

    let out = output::render_list(
        &global.output,
        &records,
        |r| RecordRow::from(r),
        |r| r.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The search window: `--start`/`--end` if given, otherwise the last
/// `--seconds` (or the configured clip length) up to `now`.
fn search_window(
    args: &RecordsArgs,
    clip_seconds: u64,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), CliError> {
    if let Some(start) = args.start {
        return Ok((start, args.end.unwrap_or(now)));
    }
    let seconds = args.seconds.unwrap_or(clip_seconds);
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|span| now.checked_sub_signed(span))
        .map(|start| (start, now))
        .ok_or_else(|| CliError::Validation {
            field: "seconds".into(),
            reason: format!("{seconds} is out of range"),
        })
}
