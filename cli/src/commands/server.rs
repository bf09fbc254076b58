//! Server command implementation

use anyhow::{Context, Result};
use clap::Args;
use perfkit_collector::config::CollectorConfig;
use perfkit_collector::server;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Host to bind (overrides config)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServerArgs {
    fn apply(self, config: &mut CollectorConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

pub async fn run(args: ServerArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = CollectorConfig::load(config_path).context("Failed to load config")?;
    args.apply(&mut config);

    server::run(config, server::ctrl_c())
        .await
        .context("Collector server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = CollectorConfig::default();
        ServerArgs {
            host: None,
            port: Some(9090),
        }
        .apply(&mut config);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 9090);
    }
}
