mod cli;
mod commands;
mod config;
mod error;
mod output;

use avycon_api::AvyconClient;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "clipper", &mut std::io::stdout());
            Ok(())
        }

        // Everything else runs inside one login session
        cmd => {
            let global = &cli.global;
            let file_config = config::load_config(global.config.as_deref())?;
            let resolved = config::resolve(global, file_config)?;
            let settings = &resolved;

            tracing::debug!(command = ?cmd, base_url = %settings.base_url, "dispatching command");
            AvyconClient::oneshot(
                settings.base_url.clone(),
                settings.client.clone(),
                &settings.username,
                &settings.password,
                |client| async move { commands::dispatch(cmd, &client, global, settings).await },
            )
            .await
        }
    }
}
