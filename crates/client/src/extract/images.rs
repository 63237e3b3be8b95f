//! Image listing.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::ImageLister;
use siteprofile_core::model::RobotsPolicy;
use url::Url;

use super::{SiteExtractor, selector};
use crate::fetch::resolve;

/// Absolute image URLs in document order, deduplicated and capped at `limit`.
///
/// Lazy-loaded images are picked up through `data-src` when `src` is absent
/// or an inline placeholder.
pub fn list_images(html: &str, base: &Url, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let images = selector("img");
    let mut seen = HashSet::new();

    document
        .select(&images)
        .filter_map(|img| {
            let element = img.value();
            element
                .attr("src")
                .filter(|src| !src.trim().is_empty() && !src.starts_with("data:"))
                .or_else(|| element.attr("data-src"))
        })
        .filter_map(|src| resolve(base, src))
        .filter(|src| seen.insert(src.clone()))
        .take(limit)
        .collect()
}

#[async_trait]
impl ImageLister for SiteExtractor {
    async fn list_images(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Vec<String>> {
        let page = self.allowed_page(url, robots).await?;
        Ok(list_images(&page.body, &page.final_url, self.max_images))
    }
}
