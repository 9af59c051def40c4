mod app;
mod logging;
mod metrics;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use bookwarden_core::{load_config, validate_config, CancelHandle, RunContext, SanitizedConfig};

use app::{App, ImportTarget};

/// Book torrent acquisition and library import.
#[derive(Debug, Parser)]
#[command(name = "bookwarden", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, env = "BOOKWARDEN_CONFIG", default_value = "bookwarden.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema and seed default rows.
    Migrate,
    /// Poll every enabled feed once and dispatch matching items.
    Feedwatch,
    /// Import completed torrents into libraries.
    Import {
        #[arg(value_enum)]
        target: ImportTarget,
    },
    /// Validate configuration and check the store and the torrent client.
    Doctor,
    /// Print the configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    if let Command::Config = cli.command {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    logging::init_logging(&config.logging);
    info!(config = ?cli.config, "Configuration loaded");

    let textfile = config.metrics.textfile_path.clone();
    let (ctx, handle) = RunContext::new();
    tokio::spawn(cancel_on_signal(handle));

    let app = App::open(config)?;
    let result = match cli.command {
        Command::Migrate => app.migrate(),
        Command::Feedwatch => app.feedwatch(&ctx).await,
        Command::Import { target } => app.import(&ctx, target).await,
        Command::Doctor => app.doctor(&ctx).await,
        Command::Config => Ok(()),
    };

    if let Some(path) = textfile {
        if let Err(e) = metrics::write_textfile(&path) {
            warn!(path = ?path, error = %e, "Failed to write metrics");
        }
    }
    result
}

/// Cancel the run on Ctrl+C or SIGTERM.
async fn cancel_on_signal(handle: CancelHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Shutdown signal received, cancelling run");
    handle.cancel();
}
