//! fleetsync: keep a WordPress fleet, its hosting server, GitLab and Notion
//! in step.
//!
//! # Usage
//!
//! ```text
//! fleetsync sites [--wait]
//! fleetsync sites list [--json]
//! fleetsync sites update <site-id> [--wait] [--yes]
//! fleetsync domains [--json]
//! fleetsync sync domains [--dry-run]
//! fleetsync sync repos [--dry-run]
//! ```
//!
//! Global: `--env-file <path>`, `--config <path>`, `-v`/`-vv`, `--no-color`.

mod commands;
mod style;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use commands::{domains::DomainsArgs, sites::SitesArgs, sync::SyncCommand};
use fleetsync_core::Settings;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fleetsync",
    version,
    about = "Audit, update and track a MainWP-managed WordPress fleet",
    long_about = None,
)]
struct Cli {
    /// Read environment variables from this file instead of `./.env`.
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Config file to use instead of `~/.fleetsync/config.yaml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output on stderr (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Disable coloured output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Browse managed sites and trigger updates (interactive without a subcommand).
    Sites(SitesArgs),

    /// Report every domain on the live server and its MainWP status.
    Domains(DomainsArgs),

    /// Mirror data into the Notion tracking databases.
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    load_env(cli.env_file.as_deref())?;
    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(command = ?cli.command, "configuration loaded");

    match cli.command {
        Commands::Sites(args) => args.run(&settings),
        Commands::Domains(args) => args.run(&settings),
        Commands::Sync { command } => commands::sync::run(command, &settings),
    }
}

/// An explicit env file must exist; the implicit `.env` is optional.
fn load_env(explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

/// Logs go to stderr so stdout stays the report. `RUST_LOG` overrides `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
