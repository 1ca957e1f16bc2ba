//! Command-line interface for `issue_tracker`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{Config, Overrides, StoreBackend};
use crate::logging;

/// issue-tracker - project-scoped issue tracking over HTTP.
#[derive(Parser, Debug)]
#[command(name = "issue-tracker")]
#[command(
    author,
    version,
    about = "Project-scoped issue tracker HTTP service",
    long_about = None,
    after_help = "Configuration: defaults < issue-tracker.yaml < ISSUE_TRACKER_* env < flags."
)]
pub struct Cli {
    /// Config file (YAML); defaults to ./issue-tracker.yaml when present
    #[arg(long, global = true, env = "ISSUE_TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for reports: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Check configuration and storage
    Doctor(StoreArgs),

    /// Show version information
    Version(VersionArgs),
}

/// Storage selection shared by `serve` and `doctor`.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Storage backend
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// `SQLite` database file
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen address, e.g. 0.0.0.0:3000
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    #[command(flatten)]
    pub storage: StoreArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct VersionArgs {
    /// Print only the version number
    #[arg(long)]
    pub short: bool,
}

impl Cli {
    /// Command-line layer of the configuration.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let (bind, storage) = match &self.command {
            Some(Commands::Serve(args)) => (args.bind, Some(&args.storage)),
            Some(Commands::Doctor(args)) => (None, Some(args)),
            Some(Commands::Version(_)) | None => (None, None),
        };
        Overrides {
            bind,
            store: storage.and_then(|s| s.store),
            database: storage.and_then(|s| s.database.clone()),
            log_json: self.log_json,
        }
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command.as_ref() else {
        println!("issue-tracker - project-scoped issue tracker. Use --help for usage.");
        return Ok(());
    };

    if let Commands::Version(args) = command {
        logging::init_logging(cli.verbose, cli.quiet, cli.log_json)
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
        commands::version::execute(args, cli.json)?;
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref(), &cli.overrides())?;
    logging::init_logging(cli.verbose, cli.quiet, config.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
    tracing::debug!(?config, "configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        Commands::Serve(_) => runtime.block_on(commands::serve::execute(&config))?,
        Commands::Doctor(_) => {
            let healthy = runtime.block_on(commands::doctor::execute(&config, cli.json))?;
            if !healthy {
                std::process::exit(1);
            }
        }
        Commands::Version(_) => {}
    }

    Ok(())
}
