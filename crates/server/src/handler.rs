//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`] and logs
//! how long each call took.
use std::sync::Arc;
use std::time::Instant;

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::scrape::{ScrapeFieldParams, ScrapeParams, scrape_field_impl, scrape_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use siteprofile_core::Orchestrator;

/// The MCP server handler for siteprofile.
#[derive(Clone)]
pub struct SiteProfileServer {
    orchestrator: Arc<Orchestrator>,
    tool_router: ToolRouter<Self>,
}

fn log_call(tool: &str, started: Instant, result: &Result<CallToolResult, McpError>) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(tool, elapsed_ms, "tool call completed"),
        Err(e) => tracing::warn!(tool, elapsed_ms, error = %e.message, "tool call failed"),
    }
}

#[tool_router]
impl SiteProfileServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator, tool_router: Self::tool_router() }
    }

    /// Profile a website.
    ///
    /// Results are cached by URL; `force_refresh` recomputes and overwrites.
    #[tool(
        description = "Profile a website: robots policy, domain status, metadata, industry, logo, images, screenshot, contact info, addresses and SEO checks. Failed fields are listed under errors."
    )]
    async fn scrape(&self, params: Parameters<ScrapeParams>) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let result = scrape_impl(&self.orchestrator, params.0).await;
        log_call("scrape", started, &result);
        result
    }

    /// Compute a single field of a profile, bypassing the cache.
    #[tool(
        description = "Compute one field of a website profile (e.g. metadata, logo, seoAnalysis) and only the tasks it depends on. Not cached."
    )]
    async fn scrape_field(&self, params: Parameters<ScrapeFieldParams>) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let result = scrape_field_impl(&self.orchestrator, params.0).await;
        log_call("scrape_field", started, &result);
        result
    }

    #[tool(description = "Return the cached profile for a URL without scraping.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let result = get_impl(self.orchestrator.cache().as_ref(), params.0).await;
        log_call("cache_get", started, &result);
        result
    }

    #[tool(description = "Purge cached profiles that have expired, match a domain, or exceed an entry limit.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let result = purge_impl(self.orchestrator.cache().as_ref(), params.0).await;
        log_call("cache_purge", started, &result);
        result
    }
}

impl ServerHandler for SiteProfileServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "siteprofile".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some("Use scrape to profile a website by URL. Profiles are cached; pass force_refresh to recompute.".into()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteprofile_core::{AppConfig, MemoryCache, PipelineConfig};

    #[test]
    fn test_tools_registered() {
        let extractors = siteprofile_client::build_extractors(&AppConfig::default()).unwrap();
        let orchestrator = Orchestrator::new(extractors, Arc::new(MemoryCache::default()), PipelineConfig::default());
        let server = SiteProfileServer::new(Arc::new(orchestrator));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|tool| tool.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_get", "cache_purge", "scrape", "scrape_field"]);
    }
}
