//! Logo discovery.

use async_trait::async_trait;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::LogoFinder;
use siteprofile_core::model::{Metadata, RobotsPolicy};
use url::Url;

use super::{SiteExtractor, selector};
use crate::fetch::resolve;

/// First `<img>` whose `src` or `alt` mentions "logo", resolved against `base`.
pub fn find_logo_img(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    let images = selector("img[src]");

    document.select(&images).find_map(|img| {
        let src = img.value().attr("src")?;
        let alt = img.value().attr("alt").unwrap_or_default();
        let mentions_logo = src.to_lowercase().contains("logo") || alt.to_lowercase().contains("logo");
        if mentions_logo { resolve(base, src) } else { None }
    })
}

#[async_trait]
impl LogoFinder for SiteExtractor {
    async fn find_logo(&self, url: &str, metadata: &Metadata, robots: &RobotsPolicy) -> TaskResult<String> {
        if let Some(og_image) = metadata.og_image.as_deref().filter(|image| !image.is_empty()) {
            return Ok(og_image.to_string());
        }

        let page = self.allowed_page(url, robots).await?;
        Ok(find_logo_img(&page.body, &page.final_url).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://acme.example/").unwrap()
    }

    #[test]
    fn test_logo_by_src() {
        let html = r#"<img src="/hero.jpg" alt="Hero"><img src="/assets/Logo-dark.svg">"#;
        assert_eq!(find_logo_img(html, &base()).as_deref(), Some("https://acme.example/assets/Logo-dark.svg"));
    }

    #[test]
    fn test_logo_by_alt() {
        let html = r#"<img src="/a.png" alt="Acme LOGO">"#;
        assert_eq!(find_logo_img(html, &base()).as_deref(), Some("https://acme.example/a.png"));
    }

    #[test]
    fn test_no_logo() {
        assert_eq!(find_logo_img(r#"<img src="/hero.jpg" alt="Hero">"#, &base()), None);
    }

    #[tokio::test]
    async fn test_og_image_wins_without_fetching() {
        use crate::fetch::{FetchClient, FetchConfig, PageFetcher};
        use std::sync::Arc;

        let pages = Arc::new(PageFetcher::new(FetchClient::new(FetchConfig::default()).unwrap()));
        let extractor = SiteExtractor::new(pages.clone());
        let metadata = Metadata { og_image: Some("https://cdn.example/og.png".into()), ..Default::default() };

        let logo = extractor
            .find_logo("https://acme.example", &metadata, &RobotsPolicy::default())
            .await
            .unwrap();
        assert_eq!(logo, "https://cdn.example/og.png");
        assert_eq!(pages.memoized(), 0);
    }
}
