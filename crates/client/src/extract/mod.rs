//! HTML-based extractors.
//!
//! [`SiteExtractor`] fetches pages through a shared [`PageFetcher`] and
//! implements the page-reading extractor traits, one submodule per field.
//! Parsing is synchronous: a `scraper::Html` document is built and dropped
//! inside a plain function, never held across an await.

pub mod address;
pub mod contact;
pub mod images;
pub mod industry;
pub mod links;
pub mod logo;
pub mod metadata;
pub mod seo;
pub mod status;

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use siteprofile_core::model::RobotsPolicy;
use siteprofile_core::{ErrorOutcome, TaskResult};

use crate::fetch::{Page, PageFetcher, canonicalize};

pub use industry::KeywordClassifier;
pub use links::{Link, extract_links};

/// Default cap on listed images.
pub const DEFAULT_MAX_IMAGES: usize = 50;

/// Page-reading extractor shared by every HTML-derived field.
#[derive(Debug, Clone)]
pub struct SiteExtractor {
    pages: Arc<PageFetcher>,
    max_images: usize,
}

impl SiteExtractor {
    pub fn new(pages: Arc<PageFetcher>) -> Self {
        Self { pages, max_images: DEFAULT_MAX_IMAGES }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// Fetch `url` once robots rules allow its path.
    async fn allowed_page(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Arc<Page>> {
        let url = canonicalize(url)?;
        if !robots.is_path_allowed(url.path()) {
            return Err(ErrorOutcome::disallowed(format!("{} is disallowed by robots.txt", url.path())));
        }
        Ok(self.pages.page(url.as_str()).await?)
    }
}

/// Parse a static CSS selector.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

/// `content` of the first `<meta>` whose `attr` equals `name`, ignoring case.
pub(crate) fn meta_content(document: &Html, attr: &str, name: &str) -> Option<String> {
    let meta = selector("meta");
    document
        .select(&meta)
        .filter(|element| element.value().attr(attr).is_some_and(|value| value.eq_ignore_ascii_case(name)))
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Text of an element with whitespace runs collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Human-visible text of a document: script, style and template bodies are skipped.
pub(crate) fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|element| element.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
        if !hidden && !text.trim().is_empty() {
            parts.push(text.trim());
        }
    }
    parts.join(" ")
}
