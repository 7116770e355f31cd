mod commands;
mod config;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlshift::CancellationToken;

use crate::config::GlobalArgs;
use crate::logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "sqlshift")]
#[command(version)]
#[command(about = "Run, roll back and scaffold versioned SQL migrations")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate to a version, or to the newest migration
    Migrate {
        /// Target version or "max"
        #[arg(default_value = "max")]
        target: String,
    },

    /// Revert the latest migrations
    Down {
        /// Number of migrations to revert
        #[arg(default_value_t = 1)]
        steps: u32,
    },

    /// Create a new do/undo migration pair
    New {
        /// Description, turned into the file name slug
        description: String,

        /// Version numbering: int or timestamp
        #[arg(long, default_value = "int")]
        mode: String,
    },

    /// Drop the state table
    DropSchema,

    /// List migrations and mark the current version
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Cancel `cancel` on Ctrl-C or once `timeout` elapses
fn spawn_watchdog(cancel: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::signal::ctrl_c() => tracing::warn!("interrupted, cancelling"),
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "timed out, cancelling")
            }
        }
        cancel.cancel();
    });
}

async fn run(cli: Cli) -> Result<()> {
    let file = config::load_file(&cli.global)?;
    let settings = config::resolve(&cli.global, file, |name| std::env::var(name).ok())?;
    tracing::debug!(driver = %settings.kind, pattern = %settings.config.migration_pattern, "resolved settings");

    let cancel = CancellationToken::new();
    spawn_watchdog(cancel.clone(), Duration::from_secs(cli.global.timeout_secs));

    let result = match cli.command {
        Commands::Migrate { target } => commands::migrate::run(&settings, &cancel, &target).await,
        Commands::Down { steps } => commands::migrate::down(&settings, &cancel, steps).await,
        Commands::New { description, mode } => commands::new::create(&settings, &description, &mode),
        Commands::DropSchema => commands::schema::drop(&settings, &cancel).await,
        Commands::List { json } => commands::list::run(&settings, &cancel, json).await,
    };

    // stop the watchdog
    cancel.cancel();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_flags(cli.global.log_level.as_deref(), cli.global.log_json);
    if let Err(e) = logging::init_logging(&logging) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
