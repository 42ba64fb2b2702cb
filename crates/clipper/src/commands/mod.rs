//! Command dispatch: bridges CLI args -> DVR client calls -> output formatting.

pub mod channels;
pub mod playback;
pub mod records;
pub mod session;

use avycon_api::AvyconClient;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a DVR-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &AvyconClient,
    global: &GlobalOpts,
    settings: &Settings,
) -> Result<(), CliError> {
    match cmd {
        Command::Channels => channels::handle(client, global).await,
        Command::Records(args) => records::handle(client, args, global, settings).await,
        Command::PlaybackUrl => playback::handle_playback_url(client, global).await,
        Command::PrivateKey => playback::handle_private_key(client, global).await,
        Command::Heartbeat => session::handle_heartbeat(client, global).await,
        // Completions are handled before a connection is made
        Command::Completions(_) => Ok(()),
    }
}
