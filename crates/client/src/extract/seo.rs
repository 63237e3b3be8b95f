//! On-page SEO checks.
//!
//! Everything except the sitemap check is read from the already fetched
//! page. The sitemap check issues one HEAD request for `/sitemap.xml` when
//! robots rules allow it.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::SeoAnalyzer;
use siteprofile_core::model::{RobotsPolicy, SeoAnalysis, SeoCheck};
use url::Url;

use super::{SiteExtractor, element_text, extract_links, meta_content, selector, visible_text};
use crate::fetch::{Page, origin};

const TITLE_LEN: std::ops::RangeInclusive<usize> = 10..=60;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 50..=160;
const MIN_WORDS: usize = 300;
const SLOW_PAGE_MS: u64 = 3000;
const SITEMAP_PATH: &str = "/sitemap.xml";

fn title_check(document: &Html) -> SeoCheck {
    let title = document.select(&selector("title")).next().map(element_text).unwrap_or_default();
    let len = title.chars().count();
    if title.is_empty() {
        SeoCheck::fail("missing", "Add a <title> tag")
    } else if TITLE_LEN.contains(&len) {
        SeoCheck::pass(format!("{len} characters"))
    } else {
        SeoCheck::fail(format!("{len} characters"), "Keep the title between 10 and 60 characters")
    }
}

fn description_check(document: &Html) -> SeoCheck {
    match meta_content(document, "name", "description") {
        None => SeoCheck::fail("missing", "Add a meta description"),
        Some(description) => {
            let len = description.chars().count();
            if DESCRIPTION_LEN.contains(&len) {
                SeoCheck::pass(format!("{len} characters"))
            } else {
                SeoCheck::fail(format!("{len} characters"), "Keep the meta description between 50 and 160 characters")
            }
        }
    }
}

fn headings_check(document: &Html) -> SeoCheck {
    let h1 = document.select(&selector("h1")).count();
    match h1 {
        1 => SeoCheck::pass("1 h1"),
        0 => SeoCheck::fail("0 h1", "Add a single h1 heading"),
        n => SeoCheck::fail(format!("{n} h1"), "Use exactly one h1 heading"),
    }
}

fn alt_text_check(document: &Html) -> SeoCheck {
    let images: Vec<_> = document.select(&selector("img")).collect();
    let missing = images
        .iter()
        .filter(|img| img.value().attr("alt").is_none_or(|alt| alt.trim().is_empty()))
        .count();
    let detail = format!("{missing} of {} images without alt text", images.len());
    if missing == 0 { SeoCheck::pass(detail) } else { SeoCheck::fail(detail, "Describe every image with alt text") }
}

fn content_check(document: &Html) -> SeoCheck {
    let words = visible_text(document).split_whitespace().count();
    if words >= MIN_WORDS {
        SeoCheck::pass(format!("{words} words"))
    } else {
        SeoCheck::fail(format!("{words} words"), "Add at least 300 words of content")
    }
}

fn internal_links_check(document: &Html, base: &Url) -> SeoCheck {
    let internal = extract_links(document, base).iter().filter(|link| link.is_internal(base)).count();
    if internal > 0 {
        SeoCheck::pass(format!("{internal} internal links"))
    } else {
        SeoCheck::fail("0 internal links", "Link to other pages on the site")
    }
}

fn structured_data_check(document: &Html) -> SeoCheck {
    let json_ld = document.select(&selector(r#"script[type="application/ld+json"]"#)).count();
    let microdata = document.select(&selector("[itemscope]")).count();
    if json_ld + microdata > 0 {
        SeoCheck::pass(format!("{json_ld} JSON-LD blocks, {microdata} microdata items"))
    } else {
        SeoCheck::fail("none", "Add schema.org structured data")
    }
}

fn indexability_check(document: &Html, headers: &HeaderMap) -> SeoCheck {
    let meta = meta_content(document, "name", "robots").unwrap_or_default().to_lowercase();
    let header = headers
        .get("x-robots-tag")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    if meta.contains("noindex") {
        SeoCheck::fail("meta robots noindex", "Remove noindex from the robots meta tag")
    } else if header.contains("noindex") {
        SeoCheck::fail("X-Robots-Tag noindex", "Remove noindex from the X-Robots-Tag header")
    } else {
        SeoCheck::pass("indexable")
    }
}

fn canonical_check(document: &Html) -> SeoCheck {
    let canonical = document
        .select(&selector(r#"link[rel="canonical"][href]"#))
        .filter_map(|link| link.value().attr("href"))
        .find(|href| !href.trim().is_empty());
    match canonical {
        Some(href) => SeoCheck::pass(href.trim()),
        None => SeoCheck::fail("missing", "Add a canonical link"),
    }
}

fn speed_check(fetch_ms: u64) -> SeoCheck {
    if fetch_ms < SLOW_PAGE_MS {
        SeoCheck::pass(format!("{fetch_ms} ms"))
    } else {
        SeoCheck::fail(format!("{fetch_ms} ms"), "Serve the page in under 3 seconds")
    }
}

/// Run every check readable from the page itself. `xml_sitemap` is left at
/// its default.
pub fn analyze_page(page: &Page) -> SeoAnalysis {
    let document = Html::parse_document(&page.body);
    SeoAnalysis {
        title_tag: title_check(&document),
        meta_description: description_check(&document),
        headings: headings_check(&document),
        image_alt_text: alt_text_check(&document),
        content_quality: content_check(&document),
        internal_links: internal_links_check(&document, &page.final_url),
        structured_data: structured_data_check(&document),
        indexability: indexability_check(&document, &page.headers),
        canonical_tag: canonical_check(&document),
        xml_sitemap: SeoCheck::default(),
        site_speed: speed_check(page.fetch_ms),
    }
}

impl SiteExtractor {
    async fn sitemap_check(&self, site: &Url, robots: &RobotsPolicy) -> SeoCheck {
        if !robots.is_path_allowed(SITEMAP_PATH) {
            return SeoCheck::fail("disallowed by robots.txt", "Allow crawlers to read /sitemap.xml");
        }
        let sitemap = format!("{}{SITEMAP_PATH}", origin(site));
        match self.pages.client().exists(&sitemap).await {
            Ok(true) => SeoCheck::pass(sitemap),
            Ok(false) => SeoCheck::fail(format!("{sitemap} not found"), "Publish an XML sitemap"),
            Err(e) => {
                tracing::debug!(error = %e, "sitemap check failed");
                SeoCheck::fail(format!("{sitemap} unreachable"), "Publish an XML sitemap")
            }
        }
    }
}

#[async_trait]
impl SeoAnalyzer for SiteExtractor {
    async fn analyze(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<SeoAnalysis> {
        let page = self.allowed_page(url, robots).await?;
        let mut analysis = analyze_page(&page);
        analysis.xml_sitemap = self.sitemap_check(&page.final_url, robots).await;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use reqwest::header::HeaderValue;

    fn page(body: &str, headers: HeaderMap, fetch_ms: u64) -> Page {
        let url = Url::parse("https://acme.example/").unwrap();
        Page {
            url: url.clone(),
            final_url: url,
            status: StatusCode::OK,
            content_type: Some("text/html".into()),
            headers,
            body: body.to_string(),
            fetch_ms,
        }
    }

    fn good_page() -> String {
        let words = "fresh bread ".repeat(160);
        format!(
            r#"<html><head>
                <title>Acme Bakery in Cape Town</title>
                <meta name="description" content="Sourdough, pastries and coffee baked fresh every morning in Cape Town.">
                <link rel="canonical" href="https://acme.example/">
                <script type="application/ld+json">{{"@type": "Bakery"}}</script>
            </head><body>
                <h1>Acme Bakery</h1>
                <img src="/bread.jpg" alt="Sourdough loaf">
                <p>{words}</p>
                <a href="/menu">Menu</a>
            </body></html>"#
        )
    }

    #[test]
    fn test_well_formed_page_passes() {
        let analysis = analyze_page(&page(&good_page(), HeaderMap::new(), 120));
        assert!(analysis.title_tag.passed);
        assert!(analysis.meta_description.passed);
        assert!(analysis.headings.passed);
        assert!(analysis.image_alt_text.passed);
        assert!(analysis.content_quality.passed);
        assert!(analysis.internal_links.passed);
        assert!(analysis.structured_data.passed);
        assert!(analysis.indexability.passed);
        assert!(analysis.canonical_tag.passed);
        assert!(analysis.site_speed.passed);
        assert_eq!(analysis.score(), 10);
    }

    #[test]
    fn test_bare_page_fails_with_recommendations() {
        let html = r#"<html><head><title>Hi</title></head><body><h1>A</h1><h1>B</h1><img src="/x.png"></body></html>"#;
        let analysis = analyze_page(&page(html, HeaderMap::new(), 4500));

        assert_eq!(analysis.title_tag.detail, "2 characters");
        assert!(analysis.title_tag.recommendation.is_some());
        assert!(!analysis.meta_description.passed);
        assert_eq!(analysis.headings.detail, "2 h1");
        assert_eq!(analysis.image_alt_text.detail, "1 of 1 images without alt text");
        assert!(!analysis.content_quality.passed);
        assert!(!analysis.internal_links.passed);
        assert!(!analysis.structured_data.passed);
        assert!(!analysis.canonical_tag.passed);
        assert!(!analysis.site_speed.passed);
        assert_eq!(analysis.score(), 1);
    }

    #[test]
    fn test_noindex_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-robots-tag", HeaderValue::from_static("noindex, nofollow"));
        let analysis = analyze_page(&page(&good_page(), headers, 120));
        assert!(!analysis.indexability.passed);
        assert_eq!(analysis.indexability.detail, "X-Robots-Tag noindex");
    }

    #[tokio::test]
    async fn test_sitemap_disallowed_skips_request() {
        use crate::fetch::{FetchClient, FetchConfig, PageFetcher};
        use std::sync::Arc;

        let pages = Arc::new(PageFetcher::new(FetchClient::new(FetchConfig::default()).unwrap()));
        let extractor = SiteExtractor::new(pages);
        let robots = RobotsPolicy {
            allowed: true,
            base_url: "https://acme.example".into(),
            disallowed_paths: vec!["/sitemap".into()],
            crawl_delay: None,
        };
        let site = Url::parse("https://acme.example/").unwrap();

        let check = extractor.sitemap_check(&site, &robots).await;
        assert!(!check.passed);
        assert_eq!(check.detail, "disallowed by robots.txt");
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_analyze_live_site() {
        use crate::fetch::{FetchClient, FetchConfig, PageFetcher};
        use std::sync::Arc;

        let pages = Arc::new(PageFetcher::new(FetchClient::new(FetchConfig::default()).unwrap()));
        let robots = RobotsPolicy { allowed: true, base_url: "https://example.com".into(), ..Default::default() };
        let analysis = SiteExtractor::new(pages).analyze("https://example.com", &robots).await.unwrap();
        assert!(analysis.title_tag.detail.ends_with("characters"));
    }
}
