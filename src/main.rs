use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use rundown_watcher::config::Config;
use rundown_watcher::control_plane::FilePollingConfigSource;
use rundown_watcher::models::RundownId;
use rundown_watcher::observability::init_tracing;
use rundown_watcher::resolver::MarkerFieldBoundaryDetector;
use rundown_watcher::supervisor::Supervisor;

/// Grace period before exiting on a fatal startup failure, so the
/// failure log line has a chance to flush and an orchestrator restarting
/// this process doesn't spin-loop too tightly.
const STARTUP_FAILURE_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "inews-rundown-watcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Polls an NRCS queue for rundown changes and republishes them as ordered events")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level (overridden by RUST_LOG if set)
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Force a one-shot resync of a single rundown on startup, bypassing
    /// the in-memory cache for it on the first poll.
    #[arg(long, value_name = "RUNDOWN_ID")]
    resync: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            // Tracing isn't initialized yet; this is the one place we
            // fall back to eprintln so the failure is never silent.
            eprintln!("failed to load configuration from {}: {error}", cli.config.display());
            tokio::time::sleep(STARTUP_FAILURE_GRACE).await;
            return Err(error);
        }
    };

    init_tracing(&cli.log_level, config.logging.format)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %cli.config.display(),
        "starting inews-rundown-watcher"
    );

    let initial_resync = cli.resync.map(RundownId::from);
    let boundary = Arc::new(MarkerFieldBoundaryDetector);
    let supervisor = Supervisor::new(boundary, initial_resync);
    let config_source = FilePollingConfigSource::new(cli.config, config.config_reload_interval);

    tokio::select! {
        _ = supervisor.run(config_source) => {
            error!("configuration source ended unexpectedly, shutting down");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown signal received");
        }
    }

    Ok(())
}
