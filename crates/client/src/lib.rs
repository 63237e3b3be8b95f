//! Network-facing extractors for siteprofile.
//!
//! This crate provides the HTTP fetch pipeline, the robots.txt gate, HTML
//! extractors and headless screenshots, and wires them into the
//! [`Extractors`] set the core orchestrator schedules.

pub mod extract;
pub mod fetch;
pub mod render;

use std::sync::Arc;

use siteprofile_core::{AppConfig, Extractors};
use thiserror::Error;

pub use extract::{KeywordClassifier, Link, SiteExtractor, extract_links};
pub use fetch::{FetchClient, FetchConfig, FetchError, Page, PageFetcher, RobotsError, RobotsGate};
pub use render::{RenderError, RenderOptions, Screenshotter};

/// Failure to assemble the extractor set.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Robots(#[from] RobotsError),
}

/// Build the production extractor set from configuration.
///
/// Every page-reading extractor shares one [`PageFetcher`], so a homepage is
/// downloaded once per scrape however many fields read it.
pub fn build_extractors(config: &AppConfig) -> Result<Extractors, BuildError> {
    let client = FetchClient::new(FetchConfig::from(config))?;
    let pages = Arc::new(PageFetcher::new(client));
    let site = Arc::new(SiteExtractor::new(pages).with_max_images(config.max_images));
    let robots = Arc::new(RobotsGate::new(config.user_agent.clone(), config.timeout())?);
    let screenshot = Screenshotter::new(
        config.render_enabled,
        RenderOptions { timeout_ms: config.timeout_ms, ..RenderOptions::default() },
    );

    tracing::debug!(render = config.render_enabled, max_images = config.max_images, "built extractors");

    Ok(Extractors {
        robots,
        status: site.clone(),
        metadata: site.clone(),
        industry: Arc::new(KeywordClassifier::new()),
        logo: site.clone(),
        images: site.clone(),
        screenshot: Arc::new(screenshot),
        contact: site.clone(),
        address: site.clone(),
        seo: site,
    })
}
