//! Collector configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `.perfkit.{yaml,toml,json}` file (or an explicit path), then `PERFKIT_*`
//! environment variables where `__` separates nested keys
//! (`PERFKIT_SERVER__PORT=9090`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

/// Base name of the optional config file in the working directory.
pub const CONFIG_FILE: &str = ".perfkit";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid listen address {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Project recorded on uploads that do not name one
    pub project: String,

    /// Tags prepended to every ingested profile's tags
    pub default_tags: Vec<String>,

    pub server: ServerConfig,

    /// Max profiles kept by the in-memory store
    pub max_profiles: usize,

    /// Max accepted upload size in MiB
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let project = std::env::current_dir()
            .ok()
            .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();

        Self {
            project,
            default_tags: Vec::new(),
            server: ServerConfig::default(),
            max_profiles: 10_000,
            max_upload_mb: 64,
        }
    }
}

impl CollectorConfig {
    /// Load configuration from defaults, `path` (or `.perfkit.*` when
    /// `None`) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, true)
    }

    fn build(path: Option<&Path>, with_env: bool) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(CONFIG_FILE).required(false)),
        };

        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("PERFKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("default_tags")
                    .try_parsing(true),
            );
        }

        let config: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Resolve `server.host:server.port` to a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::InvalidAddress(addr))
    }

    /// Base URL clients use to reach the server.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }
}
