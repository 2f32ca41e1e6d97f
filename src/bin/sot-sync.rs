// Copyright (c) 2025 - Cowboy AI, Inc.
//! sot-sync - batch reconciler
//!
//! Applies a desired-state inventory to Nautobot and prints every outcome as
//! one JSON object per line.
//!
//! Run with: cargo run --bin sot-sync --features nautobot -- config.yaml inventory.yaml
//!
//! Connection settings come from the config file and may be overridden with
//! `NAUTOBOT_URL`, `NAUTOBOT_TOKEN` and `NAUTOBOT_TIMEOUT_SECS`. The exit
//! status is non-zero when any outcome failed.

use anyhow::{bail, Context, Result};
use cim_sot::{Inventory, SotConfig, SotSession};
use std::io::Write;
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(inventory_path)) = (args.next(), args.next()) else {
        bail!("usage: sot-sync <config.yaml> <inventory.yaml>");
    };

    let config = SotConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    let inventory = Inventory::load(&inventory_path)
        .with_context(|| format!("Failed to load inventory from {}", inventory_path))?;
    info!(
        "applying {} devices from {} to {}",
        inventory.devices.len(),
        inventory_path,
        config.nautobot.url
    );

    let session = SotSession::connect(config).context("Failed to connect to Nautobot")?;
    let summary = inventory.apply(&session).await;

    let outcomes = session.drain_log();
    let failed = outcomes.iter().filter(|outcome| !outcome.success).count();
    let mut stdout = std::io::stdout().lock();
    for outcome in &outcomes {
        let line = serde_json::to_string(outcome).context("Failed to serialize outcome")?;
        writeln!(stdout, "{}", line)?;
    }

    if failed > 0 || !summary.failed.is_empty() {
        warn!(
            "{} of {} outcomes failed; devices not reconciled: {:?}",
            failed,
            outcomes.len(),
            summary.failed
        );
        return Ok(ExitCode::FAILURE);
    }
    info!("all {} outcomes succeeded", outcomes.len());
    Ok(ExitCode::SUCCESS)
}
