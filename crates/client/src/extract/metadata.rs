//! Title, description, keywords and Open Graph tags.

use async_trait::async_trait;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::MetadataFetcher;
use siteprofile_core::model::{Metadata, RobotsPolicy};
use url::Url;

use super::{SiteExtractor, element_text, meta_content, selector};
use crate::fetch::resolve;

/// Read page metadata. `og:image` is resolved against `base`.
pub fn parse_metadata(html: &str, base: &Url) -> Metadata {
    let document = Html::parse_document(html);
    let title = document
        .select(&selector("title"))
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty());

    Metadata {
        title,
        description: meta_content(&document, "name", "description"),
        keywords: meta_content(&document, "name", "keywords"),
        og_title: meta_content(&document, "property", "og:title"),
        og_description: meta_content(&document, "property", "og:description"),
        og_image: meta_content(&document, "property", "og:image").and_then(|image| resolve(base, &image)),
    }
}

#[async_trait]
impl MetadataFetcher for SiteExtractor {
    async fn fetch_metadata(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Metadata> {
        let page = self.allowed_page(url, robots).await?;
        Ok(parse_metadata(&page.body, &page.final_url))
    }
}
