//! Stride: personal Strava activity archive.
//!
//! # Usage
//!
//! ```text
//! stride sync [--limit N] [--new | --older] [--force] [--sleep SECONDS] [--archive-dir PATH] [--json]
//! stride status [--archive-dir PATH] [--json]
//! stride report activities|runs|all [--archive-dir PATH] [--out DIR]
//! stride auth url [--redirect-uri URI]
//! stride auth exchange <CODE>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{auth::AuthCommand, report::ReportArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stride",
    version,
    about = "Keep a complete local archive of your Strava activities",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Archive activities that are not yet on disk.
    Sync(SyncArgs),

    /// Show archive size, date range and token state.
    Status(StatusArgs),

    /// Render text logs from the archive.
    Report(ReportArgs),

    /// One-time OAuth authorization.
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Report(args) => args.run(),
        Commands::Auth { command } => commands::auth::run(command),
    }
}

/// Logs go to stderr; stdout is reserved for command output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
