//! HTTP fetch pipeline.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! ### Page memo
//! Several extractors read the same page during one scrape. [`PageFetcher`]
//! shares one in-flight fetch per URL and keeps the result for a short
//! window so the page is downloaded once per request.

pub mod robots;
pub mod url;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, header};
use tokio::sync::OnceCell;

pub use robots::{RobotsError, RobotsGate};
pub use self::url::{UrlError, canonicalize, origin, resolve};

use siteprofile_core::{AppConfig, ErrorOutcome};

/// How long a fetched page is shared between extractors.
const PAGE_TTL: Duration = Duration::from_secs(30);

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "siteprofile/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "siteprofile/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("status {0}")]
    Status(u16),

    #[error("{size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout(err.to_string()) } else { FetchError::Network(err.to_string()) }
    }
}

impl From<FetchError> for ErrorOutcome {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(e) => e.into(),
            FetchError::Timeout(msg) => ErrorOutcome::timeout(msg),
            FetchError::Status(404) => ErrorOutcome::not_found("status 404"),
            FetchError::TooLarge { .. } => ErrorOutcome::extract_failed(err.to_string()),
            FetchError::Client(msg) => ErrorOutcome::internal(msg),
            other => ErrorOutcome::upstream(other.to_string()),
        }
    }
}

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// The canonical URL requested
    pub url: ::url::Url,
    /// The final URL after redirects
    pub final_url: ::url::Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: header::HeaderMap,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP fetch client with redirect and size limits.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL. Non-success statuses are errors.
    pub async fn fetch(&self, url_str: &str) -> Result<Page, FetchError> {
        let start = Instant::now();
        let url = canonicalize(url_str)?;

        let response = self
            .http
            .get(url.as_str())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;

        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(Page {
            url,
            final_url,
            status,
            content_type,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            fetch_ms,
        })
    }

    /// Whether `url` answers a HEAD request with a success status.
    pub async fn exists(&self, url: &str) -> Result<bool, FetchError> {
        let response = self.http.head(url).send().await.map_err(FetchError::from_reqwest)?;
        Ok(response.status().is_success())
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

struct MemoEntry {
    cell: Arc<OnceCell<Result<Arc<Page>, FetchError>>>,
    created: Instant,
}

/// Fetch client that shares pages between concurrent extractors.
pub struct PageFetcher {
    client: FetchClient,
    pages: Mutex<HashMap<String, MemoEntry>>,
    ttl: Duration,
}

impl PageFetcher {
    pub fn new(client: FetchClient) -> Self {
        Self { client, pages: Mutex::new(HashMap::new()), ttl: PAGE_TTL }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    /// Fetch `url`, joining an in-flight or recent fetch of the same URL.
    pub async fn page(&self, url: &str) -> Result<Arc<Page>, FetchError> {
        let cell = {
            let mut pages = self.pages.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let ttl = self.ttl;
            pages.retain(|_, entry| entry.created.elapsed() < ttl);
            pages
                .entry(url.to_string())
                .or_insert_with(|| MemoEntry { cell: Arc::new(OnceCell::new()), created: Instant::now() })
                .cell
                .clone()
        };

        cell.get_or_init(|| async { self.client.fetch(url).await.map(Arc::new) })
            .await
            .clone()
    }

    /// Number of memoized pages, including failed fetches.
    pub fn memoized(&self) -> usize {
        self.pages.lock().map(|pages| pages.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("client", &self.client)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
