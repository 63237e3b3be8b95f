//! scrape and scrape_field tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use siteprofile_core::{Error, Field, Orchestrator};

use super::json_result;

/// Parameters for the scrape tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeParams {
    /// The URL of the site to profile.
    pub url: String,

    /// Skip the cache and recompute the profile.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Parameters for the scrape_field tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeFieldParams {
    /// The URL of the site to profile.
    pub url: String,

    /// Field name, e.g. `metadata`, `logo`, `seoAnalysis` or `contact_info`.
    pub field: String,
}

/// Output from the scrape_field tool.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeFieldOutput {
    pub url: String,
    pub field: Field,
    pub value: serde_json::Value,
}

pub async fn scrape_impl(orchestrator: &Orchestrator, params: ScrapeParams) -> Result<CallToolResult, McpError> {
    let record = if params.force_refresh {
        orchestrator.scrape_fresh(&params.url).await?
    } else {
        orchestrator.scrape(&params.url).await?
    };

    json_result(&record)
}

pub async fn scrape_field_impl(
    orchestrator: &Orchestrator, params: ScrapeFieldParams,
) -> Result<CallToolResult, McpError> {
    let field: Field = params.field.parse().map_err(Error::InvalidInput)?;
    let value = orchestrator.scrape_field(&params.url, field).await?;

    json_result(&ScrapeFieldOutput { url: params.url, field, value: value.to_json() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteprofile_core::{AppConfig, MemoryCache, PipelineConfig};
    use std::sync::Arc;

    fn orchestrator() -> Orchestrator {
        let extractors = siteprofile_client::build_extractors(&AppConfig::default()).unwrap();
        Orchestrator::new(extractors, Arc::new(MemoryCache::default()), PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_scrape_empty_url() {
        let params = ScrapeParams { url: "  ".to_string(), force_refresh: false };
        let err = scrape_impl(&orchestrator(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_scrape_field_unknown_field() {
        let params = ScrapeFieldParams { url: "https://example.com".to_string(), field: "favicon".to_string() };
        let err = scrape_field_impl(&orchestrator(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("favicon"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_scrape_field_metadata_live() {
        let params = ScrapeFieldParams { url: "https://example.com".to_string(), field: "metadata".to_string() };
        let result = scrape_field_impl(&orchestrator(), params).await.unwrap();
        assert!(crate::tools::result_text(&result).contains("\"field\": \"metadata\""));
    }
}
