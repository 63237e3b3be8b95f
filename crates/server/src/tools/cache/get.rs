//! cache_get tool implementation.
//!
//! Retrieves a cached profile by URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use siteprofile_core::{CacheStore, Error, ScrapeRecord};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The URL the profile was scraped for.
    pub url: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &dyn CacheStore, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = params.url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()).into());
    }

    let json = cache.get(url).await?.ok_or_else(|| Error::CacheMiss(url.to_string()))?;
    let record: ScrapeRecord = serde_json::from_str(&json).map_err(Error::Serialization)?;

    json_result(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use siteprofile_core::{CacheDb, MemoryCache};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { url: "https://example.com".to_string() };

        let err = get_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = MemoryCache::default();
        let mut record = ScrapeRecord::empty("https://example.com");
        record.logo = "https://example.com/logo.png".to_string();
        cache
            .set("https://example.com", &serde_json::to_string(&record).unwrap())
            .await
            .unwrap();

        let params = CacheGetParams { url: "https://example.com".to_string() };
        let result = get_impl(&cache, params).await.unwrap();
        let cached: ScrapeRecord = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(cached, record);
    }

    #[tokio::test]
    async fn test_get_impl_empty_url() {
        let cache = MemoryCache::default();
        let params = CacheGetParams { url: " ".to_string() };
        assert!(get_impl(&cache, params).await.is_err());
    }
}
