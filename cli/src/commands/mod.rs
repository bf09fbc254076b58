//! Subcommand implementations

pub mod capture;
pub mod compare;
pub mod get;
pub mod quickstart;
pub mod server;
pub mod session;

use crate::client::ApiClient;
use anyhow::{Context, Result};
use clap::Args;
use perfkit_collector::config::CollectorConfig;
use std::path::Path;

/// Where the collector runs.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArg {
    /// perfkit server URL [default: from config, http://localhost:8080]
    #[arg(long = "server")]
    pub url: Option<String>,
}

impl ServerArg {
    pub fn client(&self, config: Option<&Path>) -> Result<ApiClient> {
        let url = match &self.url {
            Some(url) => url.clone(),
            None => CollectorConfig::load(config)
                .context("Failed to load config")?
                .server_url(),
        };
        Ok(ApiClient::new(&url))
    }
}
