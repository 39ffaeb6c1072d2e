//! Location Sync
//!
//! Keeps the `loc` label of every PCE workload consistent with a reference
//! IP list that maps subnets (`from_ip`) to location names (`description`).
//! Workloads whose primary address falls in a mapped subnet but whose location
//! label says otherwise are relabelled; everything else is left alone.

mod config;
mod drift;
mod error;
mod label_catalog;
mod reconciler;
#[cfg(test)]
mod reconciler_test;
mod report;
mod subnet_index;

use crate::config::Config;
use crate::error::SyncError;
use clap::Parser;
use pce_client::PceClient;
use reconciler::Reconciler;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    let config = Config::parse();

    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    info!("Starting Location Sync");
    info!("Configuration:");
    info!("  PCE: {}:{}", config.fqdn, config.port);
    info!("  IP list: {}", config.ipl);
    info!("  Dry run: {}", config.dry_run);

    let client = PceClient::connect(&config.pce_config()).await?;
    let reconciler = Reconciler::new(client, config.reconcile_options());

    let report = reconciler.reconcile(&config.ipl).await?;
    report.log_summary();
    if report.has_errors() {
        warn!("Run completed with {} problem workloads", report.errors.len());
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
