//! Playback endpoint handlers.
//!
//! Both calls print what the DVR returned. Structured formats get the raw
//! payload; table and plain formats go through the typed views.

use avycon_api::{AvyconClient, PlaybackUrls, PrivateKeys};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle_playback_url(
    client: &AvyconClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let data = client.playback_url().await?;
    let urls = PlaybackUrls::from_value(&data)?;
    let out = output::render_single(
        &global.output,
        &data,
        |_| {
            output::detail_lines(&[
                ("mpd", urls.mpd.clone()),
                ("keepalive", urls.keepalive.clone()),
                ("stop", urls.stop.clone()),
            ])
        },
        |_| urls.mpd.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_private_key(
    client: &AvyconClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let envelope = client.private_key().await?;
    let keys = PrivateKeys::from_value(&envelope)?;
    let out = output::render_single(
        &global.output,
        &envelope,
        |_| {
            let pairs: Vec<(&str, String)> = keys
                .id_keys
                .iter()
                .map(|k| (k.id.as_str(), k.key.clone()))
                .collect();
            output::detail_lines(&pairs)
        },
        |_| {
            keys.id_keys
                .iter()
                .map(|k| k.key.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
