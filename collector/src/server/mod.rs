//! HTTP surface of the collector: REST API plus admin endpoints

pub mod api;
pub mod http;

use crate::config::{CollectorConfig, ConfigError};
use crate::store::{InMemoryStore, ProfileStore};
use std::future::Future;
use std::sync::Arc;

pub use http::serve;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub config: Arc<CollectorConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProfileStore>, config: CollectorConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("http server: {0}")]
    Http(#[from] hyper::Error),
}

/// Serve `config` with a fresh in-memory store until `shutdown` resolves.
pub async fn run<F>(config: CollectorConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    let addr = config.listen_addr()?;
    let store = Arc::new(InMemoryStore::new(config.max_profiles));
    tracing::info!(
        project = %config.project,
        max_profiles = config.max_profiles,
        max_upload_mb = config.max_upload_mb,
        "starting collector"
    );
    serve(addr, AppState::new(store, config), shutdown).await?;
    tracing::info!("collector stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
