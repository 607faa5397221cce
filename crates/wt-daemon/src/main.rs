//! watchtower daemon: scans a GitHub repository on a schedule and serves
//! the chat and report API.

use anyhow::{Context, Result};
use tracing::info;
use wt_core::config::Config;
use wt_daemon::daemon::Daemon;
use wt_telemetry::logging::{self, LogFormat};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::load().context("failed to load configuration")?;

    logging::init(
        LogFormat::from_config(&config.general.log_format),
        "watchtower",
        &config.general.log_level,
    );
    info!(
        version = env!("CARGO_PKG_VERSION"),
        project = %config.general.project_name,
        dotenv_loaded,
        "watchtower starting"
    );

    let daemon = Daemon::new(config)?;
    let shutdown = daemon.shutdown_handle();

    // Wire ctrl-c to trigger graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("ctrl-c received, initiating shutdown");
        shutdown.trigger();
    });

    daemon.run().await
}
