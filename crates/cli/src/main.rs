//! siteprofile command-line client.
//!
//! Runs the same pipeline as the MCP server in-process and prints JSON to
//! stdout. Logs go to stderr, filtered by `RUST_LOG`.

mod arguments;

use anyhow::{Context, Result, bail};
use arguments::{Args, CacheCommand, Command};
use clap::Parser;
use serde::Serialize;
use siteprofile_core::{AppConfig, Orchestrator, PipelineConfig, PurgeFilter, ScrapeRecord, cache};
use tracing_subscriber::EnvFilter;

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "parsed arguments");
    let config = AppConfig::load().context("failed to load configuration")?;
    let store = cache::open(&config).await.context("failed to open cache")?;

    match args.command {
        Command::Scrape { url, field, force_refresh } => {
            let extractors = siteprofile_client::build_extractors(&config).context("failed to build extractors")?;
            let orchestrator = Orchestrator::new(extractors, store, PipelineConfig::from(&config));

            match field {
                Some(field) => {
                    let value = orchestrator.scrape_field(&url, field).await?;
                    print_json(&value.to_json(), args.pretty)?;
                }
                None => {
                    let record = if force_refresh {
                        orchestrator.scrape_fresh(&url).await?
                    } else {
                        orchestrator.scrape(&url).await?
                    };
                    print_json(&record, args.pretty)?;
                }
            }
        }
        Command::Cache(CacheCommand::Get { url }) => {
            let Some(json) = store.get(url.trim()).await? else {
                bail!("no cached profile for {url}");
            };
            let record: ScrapeRecord = serde_json::from_str(&json).context("cached profile is unreadable")?;
            print_json(&record, args.pretty)?;
        }
        Command::Cache(CacheCommand::Purge { expired, domain, max_entries }) => {
            let filter = PurgeFilter { expired, domain, max_entries };
            if filter.is_empty() {
                bail!("at least one of --expired, --domain or --max-entries is required");
            }
            let deleted = store.purge(&filter).await?;
            print_json(&serde_json::json!({ "deleted": deleted }), args.pretty)?;
        }
    }

    Ok(())
}
