//! Cache-aware scrape pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::error::{ErrorOutcome, TaskResult};
use crate::extractors::Extractors;
use crate::model::{Field, FieldValue, RobotsPolicy, ScrapeRecord};

use super::aggregate::assemble;
use super::executor::{ExecutionMode, Executor, TaskOutputs};
use super::graph::{FailurePolicy, GraphError, TaskGraph, TaskNode};
use super::single_flight::InFlight;
use super::timing::elapsed_seconds;

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Upper bound on a single extractor task.
    pub task_timeout: Duration,
    /// Serialize concurrent misses for the same URL.
    pub single_flight: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { task_timeout: Duration::from_secs(60), single_flight: false }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self { task_timeout: config.task_timeout(), single_flight: config.single_flight }
    }
}

/// Runs scrapes against a set of extractors, memoizing records by URL.
pub struct Orchestrator {
    extractors: Extractors,
    cache: Arc<dyn CacheStore>,
    config: PipelineConfig,
    in_flight: InFlight,
}

impl Orchestrator {
    pub fn new(extractors: Extractors, cache: Arc<dyn CacheStore>, config: PipelineConfig) -> Self {
        Self { extractors, cache, config, in_flight: InFlight::new() }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Profile `url`, serving from the cache when possible.
    ///
    /// Returns the gate's outcome if robots resolution fails; every other
    /// task failure degrades its own field.
    pub async fn scrape(&self, url: &str) -> Result<ScrapeRecord, ErrorOutcome> {
        let url = checked_url(url)?;
        let started = Instant::now();

        if let Some(record) = self.cached(url, started).await {
            return Ok(record);
        }

        let _guard = if self.config.single_flight {
            let guard = self.in_flight.acquire(url).await;
            if let Some(record) = self.cached(url, started).await {
                return Ok(record);
            }
            Some(guard)
        } else {
            None
        };

        self.compute(url, started).await
    }

    /// Profile `url` without consulting the cache. The result is still stored.
    pub async fn scrape_fresh(&self, url: &str) -> Result<ScrapeRecord, ErrorOutcome> {
        let url = checked_url(url)?;
        let started = Instant::now();

        let _guard = if self.config.single_flight { Some(self.in_flight.acquire(url).await) } else { None };
        self.compute(url, started).await
    }

    /// Compute one field and the tasks it reads. Any failure is returned.
    pub async fn scrape_field(&self, url: &str, field: Field) -> Result<FieldValue, ErrorOutcome> {
        let url = checked_url(url)?;
        let started = Instant::now();

        let graph = self.graph(url)?.subgraph(field).map_err(ErrorOutcome::from)?;
        let executor = Executor::new(self.config.task_timeout).with_mode(ExecutionMode::Strict);
        let mut outputs = executor.run(&graph).await?;

        let result = outputs
            .take(field)
            .unwrap_or_else(|| Err(ErrorOutcome::internal(format!("no task produced {field}"))));
        tracing::info!(url, %field, tasks = graph.len(), elapsed_seconds = elapsed_seconds(started), "field scraped");
        result
    }

    async fn cached(&self, url: &str, started: Instant) -> Option<ScrapeRecord> {
        let json = match self.cache.get(url).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                tracing::info!(url, "cache miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<ScrapeRecord>(&json) {
            Ok(mut record) => {
                record.elapsed_seconds = elapsed_seconds(started);
                tracing::info!(url, elapsed_seconds = record.elapsed_seconds, "cache hit");
                Some(record)
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "cached record is unreadable, recomputing");
                None
            }
        }
    }

    async fn compute(&self, url: &str, started: Instant) -> Result<ScrapeRecord, ErrorOutcome> {
        let graph = self.graph(url)?;
        let outputs = Executor::new(self.config.task_timeout).run(&graph).await?;

        let mut record = assemble(url, outputs);
        record.elapsed_seconds = elapsed_seconds(started);

        self.store(url, &record).await;
        tracing::info!(
            url,
            elapsed_seconds = record.elapsed_seconds,
            degraded = record.errors.len(),
            "scrape completed"
        );
        Ok(record)
    }

    async fn store(&self, url: &str, record: &ScrapeRecord) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(url, error = %err, "record serialization failed, not cached");
                return;
            }
        };
        if let Err(err) = self.cache.set(url, &json).await {
            tracing::warn!(url, error = %err, "cache write failed");
        }
    }

    /// The task graph for one request.
    pub fn graph(&self, url: &str) -> Result<TaskGraph, GraphError> {
        let url: Arc<str> = Arc::from(url);
        let ex = &self.extractors;

        let robots = {
            let reader = ex.robots.clone();
            let url = url.clone();
            TaskNode::new(Field::Robots, FailurePolicy::Abort, move |_| {
                let reader = reader.clone();
                let url = url.clone();
                async move {
                    let policy = reader.read_policy(&url).await?;
                    if !policy.allowed {
                        return Err(ErrorOutcome::disallowed(format!("robots.txt disallows {url}")));
                    }
                    Ok(FieldValue::Robots(policy))
                }
            })
        };

        let domain_status = {
            let probe = ex.status.clone();
            let url = url.clone();
            TaskNode::new(Field::DomainStatus, FailurePolicy::Degrade, move |_| {
                let probe = probe.clone();
                let url = url.clone();
                async move { probe.probe(&url).await.map(FieldValue::DomainStatus) }
            })
        };

        let fetcher = ex.metadata.clone();
        let metadata = gated(Field::Metadata, &url, move |url, policy, _| {
            let fetcher = fetcher.clone();
            async move {
                let target = if policy.base_url.is_empty() { url.to_string() } else { policy.base_url.clone() };
                fetcher.fetch_metadata(&target, &policy).await.map(FieldValue::Metadata)
            }
        });

        let classifier = ex.industry.clone();
        let industry = gated(Field::IndustryClassification, &url, move |url, _, inputs| {
            let classifier = classifier.clone();
            async move {
                classifier
                    .classify(&url, &inputs.metadata())
                    .await
                    .map(FieldValue::IndustryClassification)
            }
        })
        .depends_on(&[Field::Metadata]);

        let finder = ex.logo.clone();
        let logo = gated(Field::Logo, &url, move |url, policy, inputs| {
            let finder = finder.clone();
            async move {
                finder
                    .find_logo(&url, &inputs.metadata(), &policy)
                    .await
                    .map(FieldValue::Logo)
            }
        })
        .depends_on(&[Field::Metadata]);

        let lister = ex.images.clone();
        let images = gated(Field::Images, &url, move |url, policy, _| {
            let lister = lister.clone();
            async move { lister.list_images(&url, &policy).await.map(FieldValue::Images) }
        });

        let capturer = ex.screenshot.clone();
        let screenshot = gated(Field::Screenshot, &url, move |url, policy, _| {
            let capturer = capturer.clone();
            async move { capturer.capture(&url, &policy).await.map(FieldValue::Screenshot) }
        });

        let contact_finder = ex.contact.clone();
        let contact = gated(Field::ContactInfo, &url, move |url, policy, _| {
            let finder = contact_finder.clone();
            async move { finder.find_contact_info(&url, &policy).await.map(FieldValue::ContactInfo) }
        });

        let address_finder = ex.address.clone();
        let addresses = gated(Field::Addresses, &url, move |url, policy, _| {
            let finder = address_finder.clone();
            async move { finder.find_addresses(&url, &policy).await.map(FieldValue::Addresses) }
        });

        let analyzer = ex.seo.clone();
        let seo = gated(Field::SeoAnalysis, &url, move |url, policy, _| {
            let analyzer = analyzer.clone();
            async move { analyzer.analyze(&url, &policy).await.map(FieldValue::SeoAnalysis) }
        });

        TaskGraph::new(vec![
            robots,
            domain_status,
            metadata,
            industry,
            logo,
            images,
            screenshot,
            contact,
            addresses,
            seo,
        ])
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("extractors", &self.extractors)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn checked_url(url: &str) -> Result<&str, ErrorOutcome> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ErrorOutcome::invalid_url("url must not be empty"));
    }
    Ok(url)
}

/// A degradable node that runs once the robots gate has resolved.
fn gated<F, Fut>(field: Field, url: &Arc<str>, run: F) -> TaskNode
where
    F: Fn(Arc<str>, RobotsPolicy, Arc<TaskOutputs>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult<FieldValue>> + Send + 'static,
{
    let url = url.clone();
    TaskNode::new(field, FailurePolicy::Degrade, move |inputs: Arc<TaskOutputs>| {
        let pending = inputs.robots().cloned().map(|policy| run(url.clone(), policy, inputs.clone()));
        async move {
            match pending {
                Some(task) => task.await,
                None => Err(ErrorOutcome::internal("robots policy unavailable")),
            }
        }
    })
    .depends_on(&[Field::Robots])
}
