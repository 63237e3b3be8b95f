//! Homepage screenshots through a headless browser.
//!
//! The browser is launched lazily on the first capture and reused after
//! that. Without the `render` feature, or with rendering disabled in the
//! config, every capture fails with `RENDER_DISABLED`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use siteprofile_core::extractors::ScreenshotCapturer;
use siteprofile_core::model::RobotsPolicy;
use siteprofile_core::{ErrorOutcome, TaskResult};
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::fetch::canonicalize;

/// Errors that can occur while rendering a page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Rendering is turned off or not compiled in.
    #[error("rendering is disabled")]
    Disabled,

    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("screenshot failed: {0}")]
    Capture(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),
}

impl From<RenderError> for ErrorOutcome {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Disabled => ErrorOutcome::render_disabled(),
            RenderError::Timeout(_) => ErrorOutcome::timeout(err.to_string()),
            RenderError::Navigation(_) => ErrorOutcome::upstream(err.to_string()),
            other => ErrorOutcome::internal(other.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Timeout in milliseconds (default: 30000).
    pub timeout_ms: u64,

    /// Viewport dimensions (default: 1280x720).
    pub viewport: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30000, viewport: (1280, 720) }
    }
}

/// Captures a PNG of a rendered page.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn screenshot(&self, url: &Url) -> Result<Vec<u8>, RenderError>;
}

/// Headless Chrome/Chromium renderer using chromiumoxide.
#[cfg(feature = "render")]
pub struct HeadlessRenderer {
    browser: chromiumoxide::Browser,
    timeout: Duration,
}

#[cfg(feature = "render")]
impl HeadlessRenderer {
    /// Launch a browser instance.
    ///
    /// Chrome DevTools Protocol events are drained on a background task.
    pub async fn new(opts: &RenderOptions) -> Result<Self, RenderError> {
        use chromiumoxide::browser::{Browser, BrowserConfig};
        use futures_util::StreamExt;

        let (width, height) = opts.viewport;
        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .request_timeout(Duration::from_millis(opts.timeout_ms))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(RenderError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        tracing::info!(width, height, "launched headless browser");
        Ok(Self { browser, timeout: Duration::from_millis(opts.timeout_ms) })
    }
}

#[cfg(feature = "render")]
#[async_trait]
impl Renderer for HeadlessRenderer {
    async fn screenshot(&self, url: &Url) -> Result<Vec<u8>, RenderError> {
        use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
        use chromiumoxide::page::ScreenshotParams;

        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        let tab = page.clone();
        let guard = CloseGuard::new(move || async move {
            if let Err(e) = tab.close().await {
                tracing::debug!("failed to close browser tab: {e}");
            }
        });

        let captured = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(false)
                .build();
            page.screenshot(params)
                .await
                .map_err(|e| RenderError::Capture(e.to_string()))
        };
        let png = tokio::time::timeout(self.timeout, captured)
            .await
            .unwrap_or_else(|_| Err(RenderError::Timeout(self.timeout.as_millis() as u64)));

        guard.close().await;
        png
    }
}

#[cfg(feature = "render")]
async fn launch(opts: RenderOptions) -> Result<Arc<dyn Renderer>, RenderError> {
    Ok(Arc::new(HeadlessRenderer::new(&opts).await?))
}

#[cfg(not(feature = "render"))]
async fn launch(_opts: RenderOptions) -> Result<Arc<dyn Renderer>, RenderError> {
    Err(RenderError::Disabled)
}

/// Runs an async cleanup exactly once: awaited through [`CloseGuard::close`],
/// or spawned onto the runtime when the guard is dropped early (timeout,
/// task abort).
pub struct CloseGuard<F, Fut>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    cleanup: Option<F>,
}

impl<F, Fut> CloseGuard<F, Fut>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(cleanup: F) -> Self {
        Self { cleanup: Some(cleanup) }
    }

    pub async fn close(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup().await;
        }
    }
}

impl<F, Fut> Drop for CloseGuard<F, Fut>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn drop(&mut self) {
        let Some(cleanup) = self.cleanup.take() else { return };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(cleanup());
            }
            Err(_) => tracing::warn!("no runtime to run cleanup on, resource leaked"),
        }
    }
}

/// Encode PNG bytes as a `data:` URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Screenshot extractor backed by a lazily started [`Renderer`].
pub struct Screenshotter {
    enabled: bool,
    options: RenderOptions,
    renderer: OnceCell<Arc<dyn Renderer>>,
}

impl Screenshotter {
    pub fn new(enabled: bool, options: RenderOptions) -> Self {
        Self { enabled, options, renderer: OnceCell::new() }
    }

    /// Use an already running renderer.
    pub fn with_renderer(renderer: Arc<dyn Renderer>, options: RenderOptions) -> Self {
        Self { enabled: true, options, renderer: OnceCell::new_with(Some(renderer)) }
    }

    async fn renderer(&self) -> Result<&Arc<dyn Renderer>, RenderError> {
        self.renderer.get_or_try_init(|| launch(self.options)).await
    }

    /// Render `url` and return the PNG as a `data:` URL.
    pub async fn screenshot(&self, url: &Url) -> Result<String, RenderError> {
        if !self.enabled {
            return Err(RenderError::Disabled);
        }

        let renderer = self.renderer().await?;
        let timeout_ms = self.options.timeout_ms;
        let png = tokio::time::timeout(Duration::from_millis(timeout_ms), renderer.screenshot(url))
            .await
            .map_err(|_| RenderError::Timeout(timeout_ms))??;

        tracing::debug!(url = %url, bytes = png.len(), "captured screenshot");
        Ok(png_data_url(&png))
    }
}

#[async_trait]
impl ScreenshotCapturer for Screenshotter {
    async fn capture(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<String> {
        let url = canonicalize(url)?;
        if !robots.is_path_allowed(url.path()) {
            return Err(ErrorOutcome::disallowed(format!("{} is disallowed by robots.txt", url.path())));
        }
        Ok(self.screenshot(&url).await?)
    }
}
