//! robots.txt gate with per-host caching.
//!
//! Fetches robots.txt once per origin (24-hour TTL), answers whether a URL
//! may be scraped and summarizes the rules that apply to our user agent.
//! A missing robots.txt (any 4xx) allows everything; a network failure or
//! 5xx fails the gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use robotstxt_rs::RobotsTxt;
use siteprofile_core::extractors::RobotsReader;
use siteprofile_core::model::RobotsPolicy;
use siteprofile_core::{ErrorOutcome, TaskResult};
use tokio::sync::RwLock;

use super::url::{UrlError, canonicalize, origin};

/// Default TTL for robots.txt cache (24 hours).
const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum size of robots.txt to fetch (1MB).
const MAX_ROBOTS_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RobotsError {
    #[error("robots.txt disallows {path} (robots_url: {robots_url})")]
    Disallowed { path: String, robots_url: String },

    #[error("failed to fetch robots.txt: {0}")]
    Unreachable(String),

    #[error("robots.txt too large")]
    TooLarge,

    #[error(transparent)]
    InvalidUrl(#[from] UrlError),
}

impl From<RobotsError> for ErrorOutcome {
    fn from(err: RobotsError) -> Self {
        match err {
            RobotsError::Disallowed { .. } => ErrorOutcome::disallowed(err.to_string()),
            RobotsError::InvalidUrl(e) => e.into(),
            other => ErrorOutcome::robots_unreachable(other.to_string()),
        }
    }
}

/// Parsed robots.txt with the rule summary for our user agent.
struct CachedRobots {
    robots: RobotsTxt,
    disallowed_paths: Vec<String>,
    crawl_delay: Option<f64>,
    fetched_at: Instant,
}

impl CachedRobots {
    fn new(content: &str, user_agent: &str) -> Self {
        let (disallowed_paths, crawl_delay) = summarize(content, user_agent);
        Self { robots: RobotsTxt::parse(content), disallowed_paths, crawl_delay, fetched_at: Instant::now() }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > ROBOTS_TTL
    }
}

/// Collect `Disallow` and `Crawl-delay` lines of the group that applies to
/// `user_agent`, falling back to the `*` group.
fn summarize(content: &str, user_agent: &str) -> (Vec<String>, Option<f64>) {
    let product = user_agent.split('/').next().unwrap_or(user_agent).trim().to_lowercase();

    #[derive(Default)]
    struct Group {
        agents: Vec<String>,
        disallow: Vec<String>,
        crawl_delay: Option<f64>,
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut in_agent_lines = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else { continue };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !in_agent_lines || groups.is_empty() {
                    groups.push(Group::default());
                }
                if let Some(group) = groups.last_mut() {
                    group.agents.push(value.to_lowercase());
                }
                in_agent_lines = true;
            }
            "disallow" => {
                in_agent_lines = false;
                if let Some(group) = groups.last_mut()
                    && !value.is_empty()
                {
                    group.disallow.push(value.to_string());
                }
            }
            "crawl-delay" => {
                in_agent_lines = false;
                if let Some(group) = groups.last_mut() {
                    group.crawl_delay = value.parse().ok();
                }
            }
            _ => in_agent_lines = false,
        }
    }

    let specific = groups
        .iter()
        .find(|group| group.agents.iter().any(|agent| agent != "*" && product.contains(agent.as_str())));
    let wildcard = groups.iter().find(|group| group.agents.iter().any(|agent| agent == "*"));

    specific
        .or(wildcard)
        .map(|group| (group.disallow.clone(), group.crawl_delay))
        .unwrap_or_default()
}

/// robots.txt reader that implements the scrape gate.
pub struct RobotsGate {
    cache: Arc<RwLock<HashMap<String, Arc<CachedRobots>>>>,
    user_agent: String,
    http: reqwest::Client,
}

impl RobotsGate {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, RobotsError> {
        let user_agent = user_agent.into();
        let http = reqwest::Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| RobotsError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { cache: Arc::new(RwLock::new(HashMap::new())), user_agent, http })
    }

    /// Resolve the policy for `url`, failing when the URL is disallowed.
    pub async fn policy(&self, url: &str) -> Result<RobotsPolicy, RobotsError> {
        let url = canonicalize(url)?;
        let base_url = origin(&url);
        let robots = self.robots_for(&base_url).await?;

        if !robots.robots.can_fetch(&self.user_agent, url.as_str()) {
            return Err(RobotsError::Disallowed {
                path: url.path().to_string(),
                robots_url: format!("{base_url}/robots.txt"),
            });
        }

        Ok(RobotsPolicy {
            allowed: true,
            base_url,
            disallowed_paths: robots.disallowed_paths.clone(),
            crawl_delay: robots.crawl_delay,
        })
    }

    async fn robots_for(&self, base_url: &str) -> Result<Arc<CachedRobots>, RobotsError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(base_url)
                && !cached.is_expired()
            {
                tracing::debug!("robots.txt cache hit for {}", base_url);
                return Ok(cached.clone());
            }
        }

        let content = self.fetch_robots(&format!("{base_url}/robots.txt")).await?;
        let cached = Arc::new(CachedRobots::new(&content, &self.user_agent));
        self.remember(base_url, cached.clone()).await;
        Ok(cached)
    }

    async fn fetch_robots(&self, url: &str) -> Result<String, RobotsError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RobotsError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            if let Some(len) = response.content_length()
                && len as usize > MAX_ROBOTS_SIZE
            {
                return Err(RobotsError::TooLarge);
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| RobotsError::Unreachable(e.to_string()))?;
            if bytes.len() > MAX_ROBOTS_SIZE {
                return Err(RobotsError::TooLarge);
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else if status.is_client_error() {
            tracing::debug!("robots.txt not found for {}, allowing all", url);
            Ok(String::new())
        } else {
            Err(RobotsError::Unreachable(format!("status {status}")))
        }
    }

    /// Cache `cached` for `base_url`, dropping every expired origin.
    async fn remember(&self, base_url: &str, cached: Arc<CachedRobots>) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| !entry.is_expired());
        cache.insert(base_url.to_string(), cached);
    }
}

#[async_trait]
impl RobotsReader for RobotsGate {
    async fn read_policy(&self, url: &str) -> TaskResult<RobotsPolicy> {
        self.policy(url).await.map_err(ErrorOutcome::from)
    }
}
