// SPDX-License-Identifier: GPL-3.0-only

//! LVM Exporter - Prometheus metrics for LVM volume groups, logical volumes
//! and physical volumes
//!
//! Each scrape runs `vgs`, `lvs` and `pvs` and renders the parsed reports.

use anyhow::{Context, Result};
use clap::Parser;
use lvm_sys::inventory::PVSCAN;
use lvm_sys::{LvmInventory, REQUIRED_TOOLS};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod metrics;
mod server;

use config::{Args, ExporterConfig};

const DEFAULT_LOG_FILTER: &str = "lvm_exporter=info,lvm_sys=info,warn";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ExporterConfig::load(&args)?;

    // Initialize logging to stderr
    let filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level {level:?}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting LVM Exporter v{}", env!("CARGO_PKG_VERSION"));

    // LVM reporting tools need root to read device metadata
    if unsafe { libc::geteuid() } != 0 {
        tracing::warn!("Not running as root - LVM listings will likely fail");
    }

    let runner = config.command_runner();
    let mut tools = REQUIRED_TOOLS.to_vec();
    if config.inventory.reload_cache {
        tools.push(PVSCAN);
    }
    let missing = runner.missing_tools(&tools);
    if !missing.is_empty() {
        tracing::warn!(
            "LVM tools not found: {} - listings will fail until they are installed",
            missing.join(", ")
        );
    }

    tracing::info!(
        "LVM settings: bin dir {}, command timeout {}, reload cache {}, device policy {:?}",
        config
            .bin_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "<PATH>".to_string()),
        config
            .command_timeout
            .map(|timeout| format!("{}s", timeout.as_secs()))
            .unwrap_or_else(|| "<none>".to_string()),
        config.inventory.reload_cache,
        config.inventory.device_policy,
    );

    let app = server::router(
        LvmInventory::new(runner, config.inventory),
        &config.telemetry_path,
    );
    let listener = TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;

    tracing::info!(
        "Listening on {}, metrics at {}",
        config.listen_address,
        config.telemetry_path
    );
    server::serve(listener, app).await?;

    tracing::info!("LVM Exporter shutting down");
    Ok(())
}
