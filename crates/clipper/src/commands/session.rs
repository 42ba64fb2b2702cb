//! Session command handlers.

use avycon_api::AvyconClient;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle_heartbeat(client: &AvyconClient, global: &GlobalOpts) -> Result<(), CliError> {
    client.heartbeat().await?;
    if !global.quiet {
        eprintln!("Heartbeat sent");
    }
    Ok(())
}
