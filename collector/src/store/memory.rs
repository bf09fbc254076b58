//! In-memory profile store

use super::{ProfileFilter, ProfileStore, StoreError, StoredProfile};
use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::sync::RwLock;

/// Bounded store keeping the most recent profiles. Thread-safe.
#[derive(Debug)]
pub struct InMemoryStore {
    max_profiles: usize,
    profiles: RwLock<VecDeque<StoredProfile>>,
}

impl InMemoryStore {
    /// Create a store that keeps at most `max_profiles` profiles.
    pub fn new(max_profiles: usize) -> Self {
        Self {
            max_profiles,
            profiles: RwLock::new(VecDeque::with_capacity(max_profiles.min(4096))),
        }
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    /// Append a profile. Drops the oldest ones when at capacity.
    async fn save(&self, profile: StoredProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        profiles.push_back(profile);
        let mut drops = 0u64;
        while profiles.len() > self.max_profiles {
            profiles.pop_front();
            drops += 1;
        }

        crate::metrics::STORED_PROFILES.set(profiles.len() as f64);
        if drops > 0 {
            tracing::debug!(drops, "store at capacity, dropped oldest profiles");
            crate::metrics::STORE_DROPS.inc_by(drops as f64);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredProfile, StoreError> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<StoredProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn sessions(&self) -> Result<Vec<String>, StoreError> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        let names: BTreeSet<&str> = profiles
            .iter()
            .filter_map(|p| p.session.as_deref())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.len().map(|_| ())
    }
}
