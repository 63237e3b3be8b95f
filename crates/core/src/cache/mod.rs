//! Memoization of scrape records by URL.
//!
//! The pipeline only depends on the [`CacheStore`] contract. Two backends
//! are provided:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, schema migrations,
//!   optional TTL, purge by age, domain or entry count
//! - [`MemoryCache`]: process-lifetime map with a pluggable
//!   [`EvictionPolicy`] (none, TTL, LRU)

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod records;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::{EvictionPolicy, MemoryCache};

use crate::config::{AppConfig, CacheBackend};

/// Key-value store for serialized scrape records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a value; `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove entries matching `filter`, returning how many were deleted.
    async fn purge(&self, filter: &PurgeFilter) -> Result<u64, Error>;
}

/// Selection of entries to purge. Criteria are applied in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeFilter {
    /// Drop entries whose TTL has elapsed.
    #[serde(default)]
    pub expired: bool,
    /// Drop entries whose URL contains this domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Keep only the newest N entries.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl PurgeFilter {
    pub fn is_empty(&self) -> bool {
        !self.expired && self.domain.is_none() && self.max_entries.is_none()
    }
}

/// Open the backend selected by `config`.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn CacheStore>, Error> {
    match config.cache_backend {
        CacheBackend::Sqlite => {
            let db = CacheDb::open(&config.db_path)
                .await?
                .with_ttl(config.cache_ttl())
                .with_max_entries(config.cache_max_entries);
            tracing::info!(path = %config.db_path.display(), max_entries = ?config.cache_max_entries, "opened sqlite cache");
            Ok(Arc::new(db))
        }
        CacheBackend::Memory => {
            let policy = EvictionPolicy { ttl: config.cache_ttl(), max_entries: config.cache_max_entries };
            tracing::info!(?policy, "using in-memory cache");
            Ok(Arc::new(MemoryCache::new(policy)))
        }
    }
}
