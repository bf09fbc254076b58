//! perfkit collector
//!
//! Receives pprof profiles and k6 summaries over HTTP, extracts metrics and
//! serves listings and comparisons. Configuration comes from `.perfkit.*`
//! (or the file named by `PERFKIT_CONFIG`) and `PERFKIT_*` variables.

use anyhow::{Context, Result};
use perfkit_collector::config::CollectorConfig;
use perfkit_collector::server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::var_os("PERFKIT_CONFIG").map(PathBuf::from);
    let config = CollectorConfig::load(path.as_deref()).context("Failed to load configuration")?;

    server::run(config, server::ctrl_c())
        .await
        .context("Collector server error")?;

    Ok(())
}
