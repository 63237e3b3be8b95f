//! Extractor capability contracts.
//!
//! The pipeline only sees these traits. How a field is actually obtained
//! (HTTP, DOM parsing, a headless browser) belongs to the implementor.
//! Implementations must resolve in bounded time; the executor still wraps
//! every call in a timeout.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskResult;
use crate::model::{ContactInfo, DomainStatus, IndustryClassification, Metadata, RobotsPolicy, SeoAnalysis};

/// Reads robots.txt and decides whether the URL may be scraped.
#[async_trait]
pub trait RobotsReader: Send + Sync {
    async fn read_policy(&self, url: &str) -> TaskResult<RobotsPolicy>;
}

/// Probes whether a domain is live, parked or under construction.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, url: &str) -> TaskResult<DomainStatus>;
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_metadata(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Metadata>;
}

#[async_trait]
pub trait IndustryClassifier: Send + Sync {
    async fn classify(&self, url: &str, metadata: &Metadata) -> TaskResult<IndustryClassification>;
}

/// Finds the site logo. An empty string means no logo was found.
#[async_trait]
pub trait LogoFinder: Send + Sync {
    async fn find_logo(&self, url: &str, metadata: &Metadata, robots: &RobotsPolicy) -> TaskResult<String>;
}

#[async_trait]
pub trait ImageLister: Send + Sync {
    async fn list_images(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Vec<String>>;
}

/// Captures a screenshot of the page, returned as a `data:` URL.
#[async_trait]
pub trait ScreenshotCapturer: Send + Sync {
    async fn capture(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<String>;
}

#[async_trait]
pub trait ContactFinder: Send + Sync {
    async fn find_contact_info(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<ContactInfo>;
}

#[async_trait]
pub trait AddressFinder: Send + Sync {
    async fn find_addresses(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Vec<String>>;
}

#[async_trait]
pub trait SeoAnalyzer: Send + Sync {
    async fn analyze(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<SeoAnalysis>;
}

/// The full set of collaborators the orchestrator schedules.
#[derive(Clone)]
pub struct Extractors {
    pub robots: Arc<dyn RobotsReader>,
    pub status: Arc<dyn StatusProbe>,
    pub metadata: Arc<dyn MetadataFetcher>,
    pub industry: Arc<dyn IndustryClassifier>,
    pub logo: Arc<dyn LogoFinder>,
    pub images: Arc<dyn ImageLister>,
    pub screenshot: Arc<dyn ScreenshotCapturer>,
    pub contact: Arc<dyn ContactFinder>,
    pub address: Arc<dyn AddressFinder>,
    pub seo: Arc<dyn SeoAnalyzer>,
}

impl std::fmt::Debug for Extractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractors").finish_non_exhaustive()
    }
}
