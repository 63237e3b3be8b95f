//! cache_purge tool implementation.
//!
//! Purges cache entries by age, domain, or count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use siteprofile_core::{CacheStore, Error, PurgeFilter};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries whose TTL has elapsed.
    #[serde(default)]
    pub expired: bool,

    /// Purge entries whose URL contains this domain.
    pub domain: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &dyn CacheStore, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let filter = PurgeFilter { expired: params.expired, domain: params.domain, max_entries: params.max_entries };
    if filter.is_empty() {
        return Err(Error::InvalidInput("At least one of expired, domain, or max_entries must be specified".to_string())
            .into());
    }

    let deleted = cache.purge(&filter).await?;
    tracing::info!(?filter, deleted, "purged cache");

    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use siteprofile_core::CacheDb;

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.set("https://example.com/page1", "{}").await.unwrap();
        cache.set("https://other.com/page2", "{}").await.unwrap();
        cache
    }

    fn deleted(result: &CallToolResult) -> u64 {
        let output: CachePurgeOutput = serde_json::from_str(&result_text(result)).unwrap();
        output.deleted
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let cache = seeded().await;
        let params = CachePurgeParams { domain: Some("example.com".to_string()), ..Default::default() };

        let result = purge_impl(&cache, params).await.unwrap();
        assert_eq!(deleted(&result), 1);
        assert!(cache.get("https://other.com/page2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let cache = seeded().await;
        let params = CachePurgeParams { max_entries: Some(1), ..Default::default() };

        let result = purge_impl(&cache, params).await.unwrap();
        assert_eq!(deleted(&result), 1);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let cache = seeded().await;
        let result = purge_impl(&cache, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }
}
