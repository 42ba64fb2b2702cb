//! Channel command handlers.

use std::sync::Arc;

use avycon_api::{AvyconClient, Channel};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Abilities")]
    abilities: String,
}

impl From<&Arc<Channel>> for ChannelRow {
    fn from(c: &Arc<Channel>) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            alias: c.alias.clone(),
            status: if c.video_loss {
                format!("{} (video loss)", c.status)
            } else {
                c.status.to_string()
            },
            abilities: c
                .abilities
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(client: &AvyconClient, global: &GlobalOpts) -> Result<(), CliError> {
    let channels = client.fetch_channels().await?;
    let out = output::render_list(
        &global.output,
        &channels,
        |c| ChannelRow::from(c),
        |c| c.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Find a channel by exact id.
pub fn resolve_channel(channels: &[Arc<Channel>], id: &str) -> Result<Arc<Channel>, CliError> {
    channels
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "channel".into(),
            identifier: id.into(),
            list_command: "channels".into(),
        })
}
