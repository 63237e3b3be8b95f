//! In-process record cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStore, PurgeFilter};
use crate::Error;

/// Eviction rules for [`MemoryCache`]. Both limits may be combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Entries older than this are treated as absent.
    pub ttl: Option<Duration>,
    /// Least recently used entries are dropped beyond this count.
    pub max_entries: Option<usize>,
}

impl EvictionPolicy {
    /// Keep everything for the life of the process.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), max_entries: None }
    }

    pub fn lru(max_entries: usize) -> Self {
        Self { ttl: None, max_entries: Some(max_entries) }
    }
}

struct Entry {
    value: String,
    stored_at: Instant,
    last_access: Instant,
}

/// Process-wide map of URL to serialized record.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    policy: EvictionPolicy,
}

impl MemoryCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self { entries: RwLock::new(HashMap::new()), policy }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.policy.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }

    fn evict_lru(entries: &mut HashMap<String, Entry>, max_entries: usize) -> u64 {
        let excess = entries.len().saturating_sub(max_entries);
        if excess == 0 {
            return 0;
        }

        let mut by_access: Vec<(Instant, String)> =
            entries.iter().map(|(key, entry)| (entry.last_access, key.clone())).collect();
        by_access.sort();

        for (_, key) in by_access.into_iter().take(excess) {
            entries.remove(&key);
        }
        excess as u64
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").field("policy", &self.policy).finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut entries = self.entries.write().await;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) => self.is_expired(entry),
        };

        if expired {
            entries.remove(key);
            return Ok(None);
        }

        Ok(entries.get_mut(key).map(|entry| {
            entry.last_access = Instant::now();
            entry.value.clone()
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value: value.to_string(), stored_at: now, last_access: now });

        if let Some(max_entries) = self.policy.max_entries {
            let evicted = Self::evict_lru(&mut entries, max_entries);
            if evicted > 0 {
                tracing::debug!(evicted, "evicted least recently used records");
            }
        }
        Ok(())
    }

    async fn purge(&self, filter: &PurgeFilter) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        if filter.expired {
            entries.retain(|_, entry| !self.is_expired(entry));
        }
        if let Some(domain) = &filter.domain {
            entries.retain(|key, _| !key.contains(domain.as_str()));
        }
        let mut deleted = (before - entries.len()) as u64;
        if let Some(max_entries) = filter.max_entries {
            deleted += Self::evict_lru(&mut entries, max_entries);
        }
        Ok(deleted)
    }
}
