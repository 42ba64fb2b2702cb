//! Clap derive structures for the `clipper` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// clipper -- query an AVYCON DVR from the command line
#[derive(Debug, Parser)]
#[command(
    name = "clipper",
    version,
    about = "Query an AVYCON DVR from the command line",
    long_about = "Logs in to an AVYCON DVR with HTTP Digest authentication and \
        lists channels, searches recordings and fetches playback endpoints.\n\n\
        Settings come from flags, AVYCON_* environment variables, or \
        clipper/config.toml in the platform config directory.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// DVR base URL, e.g. http://192.168.1.20 (overrides AVYCON_ADDRESS)
    #[arg(long, short = 'a', global = true)]
    pub address: Option<String>,

    /// Login username (overrides AVYCON_USERNAME)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Login password (prefer AVYCON_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Path to a config file (default: clipper/config.toml in the config dir)
    #[arg(long, env = "CLIPPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List camera channels
    #[command(alias = "ch")]
    Channels,

    /// Search recorded video on one channel
    #[command(alias = "rec")]
    Records(RecordsArgs),

    /// Show the DVR's DASH playback endpoints
    PlaybackUrl,

    /// Show the DVR's playback key material
    PrivateKey,

    /// Send a session heartbeat
    Heartbeat,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Records ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RecordsArgs {
    /// Channel id, e.g. CH1 (default: AVYCON_CHANNEL_ID)
    #[arg(long, short = 'c')]
    pub channel: Option<String>,

    /// Search the last N seconds (default: CLIP_SECONDS or 120)
    #[arg(long, short = 's', conflicts_with = "start")]
    pub seconds: Option<u64>,

    /// Window start in DVR local time (YYYY-MM-DD HH:MM:SS)
    #[arg(long, value_parser = parse_local_time)]
    pub start: Option<NaiveDateTime>,

    /// Window end in DVR local time (default: now)
    #[arg(long, value_parser = parse_local_time, requires = "start")]
    pub end: Option<NaiveDateTime>,
}

const LOCAL_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_local_time(raw: &str) -> Result<NaiveDateTime, String> {
    LOCAL_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM:SS, got '{raw}'"))
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
