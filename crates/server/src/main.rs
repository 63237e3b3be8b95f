//! siteprofile MCP server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use siteprofile_core::{AppConfig, Orchestrator, PipelineConfig, cache};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let store = cache::open(&config).await.context("failed to open cache")?;
    let extractors = siteprofile_client::build_extractors(&config).context("failed to build extractors")?;
    let orchestrator = Orchestrator::new(extractors, store, PipelineConfig::from(&config));

    tracing::info!(
        backend = ?config.cache_backend,
        render = config.render_enabled,
        single_flight = config.single_flight,
        "Starting siteprofile server on stdio transport"
    );

    let handler = handler::SiteProfileServer::new(Arc::new(orchestrator));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
