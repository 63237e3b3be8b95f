//! Scripted extractors for pipeline tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::Error;
use crate::cache::{CacheStore, PurgeFilter};
use crate::error::{ErrorOutcome, TaskResult};
use crate::extractors::*;
use crate::model::{
    Classification, ContactInfo, DomainStatus, Field, IndustryClassification, Metadata, RobotsPolicy, SeoAnalysis,
    SeoCheck,
};

/// One fake site backing every extractor, with per-field call counters.
#[derive(Default)]
pub(crate) struct FakeSite {
    calls: Mutex<HashMap<Field, usize>>,
    failures: HashMap<Field, ErrorOutcome>,
    panics: HashSet<Field>,
    stalls: HashSet<Field>,
    delay: Duration,
    disallow: bool,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, field: Field, outcome: ErrorOutcome) -> Self {
        self.failures.insert(field, outcome);
        self
    }

    pub(crate) fn panicking(mut self, field: Field) -> Self {
        self.panics.insert(field);
        self
    }

    /// The task for `field` never resolves on its own.
    pub(crate) fn stalling(mut self, field: Field) -> Self {
        self.stalls.insert(field);
        self
    }

    /// Every extractor sleeps this long before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// robots.txt resolves but forbids the URL.
    pub(crate) fn disallowed(mut self) -> Self {
        self.disallow = true;
        self
    }

    pub(crate) fn extractors(self: &Arc<Self>) -> Extractors {
        Extractors {
            robots: self.clone(),
            status: self.clone(),
            metadata: self.clone(),
            industry: self.clone(),
            logo: self.clone(),
            images: self.clone(),
            screenshot: self.clone(),
            contact: self.clone(),
            address: self.clone(),
            seo: self.clone(),
        }
    }

    pub(crate) fn calls(&self, field: Field) -> usize {
        self.calls.lock().unwrap().get(&field).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    async fn step(&self, field: Field) -> TaskResult<()> {
        *self.calls.lock().unwrap().entry(field).or_default() += 1;

        if self.stalls.contains(&field) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics.contains(&field) {
            panic!("{field} extractor crashed");
        }
        match self.failures.get(&field) {
            Some(outcome) => Err(outcome.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RobotsReader for FakeSite {
    async fn read_policy(&self, _url: &str) -> TaskResult<RobotsPolicy> {
        self.step(Field::Robots).await?;
        Ok(RobotsPolicy {
            allowed: !self.disallow,
            base_url: "https://example.com".into(),
            disallowed_paths: vec!["/admin".into()],
            crawl_delay: None,
        })
    }
}

#[async_trait]
impl StatusProbe for FakeSite {
    async fn probe(&self, _url: &str) -> TaskResult<DomainStatus> {
        self.step(Field::DomainStatus).await?;
        Ok(DomainStatus::Live)
    }
}

#[async_trait]
impl MetadataFetcher for FakeSite {
    async fn fetch_metadata(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<Metadata> {
        self.step(Field::Metadata).await?;
        Ok(Metadata {
            title: Some("Example".into()),
            description: Some("An example bakery".into()),
            og_image: Some("https://example.com/og.png".into()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl IndustryClassifier for FakeSite {
    async fn classify(&self, _url: &str, metadata: &Metadata) -> TaskResult<IndustryClassification> {
        self.step(Field::IndustryClassification).await?;
        let label = if metadata.is_empty() { "unknown" } else { "food" };
        Ok(IndustryClassification {
            metadata_class: Classification { label: label.into(), score: 0.8 },
            domain_class: Classification { label: "technology".into(), score: 0.4 },
        })
    }
}

#[async_trait]
impl LogoFinder for FakeSite {
    async fn find_logo(&self, _url: &str, _metadata: &Metadata, _robots: &RobotsPolicy) -> TaskResult<String> {
        self.step(Field::Logo).await?;
        Ok("https://example.com/logo.png".into())
    }
}

#[async_trait]
impl ImageLister for FakeSite {
    async fn list_images(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<Vec<String>> {
        self.step(Field::Images).await?;
        Ok(vec!["https://example.com/a.png".into(), "https://example.com/b.jpg".into()])
    }
}

#[async_trait]
impl ScreenshotCapturer for FakeSite {
    async fn capture(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<String> {
        self.step(Field::Screenshot).await?;
        Ok("data:image/png;base64,iVBORw0KGgo=".into())
    }
}

#[async_trait]
impl ContactFinder for FakeSite {
    async fn find_contact_info(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<ContactInfo> {
        self.step(Field::ContactInfo).await?;
        Ok(ContactInfo {
            emails: BTreeSet::from(["hello@example.com".to_string()]),
            phones: BTreeSet::from(["+1 555 0100".to_string()]),
            social_links: BTreeSet::new(),
        })
    }
}

#[async_trait]
impl AddressFinder for FakeSite {
    async fn find_addresses(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<Vec<String>> {
        self.step(Field::Addresses).await?;
        Ok(vec!["1 Main St, Springfield".into()])
    }
}

#[async_trait]
impl SeoAnalyzer for FakeSite {
    async fn analyze(&self, _url: &str, _robots: &RobotsPolicy) -> TaskResult<SeoAnalysis> {
        self.step(Field::SeoAnalysis).await?;
        Ok(SeoAnalysis { title_tag: SeoCheck::pass("7 characters"), ..Default::default() })
    }
}

/// A cache whose every operation fails.
pub(crate) struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
        Err(Error::InvalidInput("cache offline".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), Error> {
        Err(Error::InvalidInput("cache offline".into()))
    }

    async fn purge(&self, _filter: &PurgeFilter) -> Result<u64, Error> {
        Err(Error::InvalidInput("cache offline".into()))
    }
}
