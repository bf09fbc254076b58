//! Profile storage
//!
//! The store persists ingested records; extraction and comparison never
//! touch it directly.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use perfkit_shared::{MetricsRecord, ProfileKind};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryStore;

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One ingested profile with its extracted metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub kind: ProfileKind,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub raw_size: usize,
    #[serde(default)]
    pub is_cumulative: bool,
    pub duration_ns: i64,
    pub total_samples: i64,
    pub total_value: i64,
    pub metrics: MetricsRecord,
    /// Uploaded bytes, served only on explicit raw download.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

/// Listing criteria. Empty fields match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    pub kind: Option<ProfileKind>,
    pub project: Option<String>,
    pub session: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ProfileFilter {
    fn default() -> Self {
        Self {
            kind: None,
            project: None,
            session: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ProfileFilter {
    pub fn session(name: impl Into<String>) -> Self {
        Self {
            session: Some(name.into()),
            limit: usize::MAX,
            ..Self::default()
        }
    }

    pub fn matches(&self, profile: &StoredProfile) -> bool {
        self.kind.map_or(true, |k| profile.kind == k)
            && self
                .project
                .as_deref()
                .map_or(true, |p| profile.project == p)
            && self
                .session
                .as_deref()
                .map_or(true, |s| profile.session.as_deref() == Some(s))
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save(&self, profile: StoredProfile) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<StoredProfile, StoreError>;

    /// Matching profiles, newest first.
    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<StoredProfile>, StoreError>;

    /// Distinct non-empty session names, sorted.
    async fn sessions(&self) -> Result<Vec<String>, StoreError>;

    /// Health probe for `/readyz`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
