//! Live / parked / under-construction detection.

use async_trait::async_trait;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::StatusProbe;
use siteprofile_core::model::DomainStatus;

use super::{SiteExtractor, visible_text};
use crate::fetch::{FetchError, canonicalize};

const PARKED_MARKERS: &[&str] = &[
    "this domain is for sale",
    "this domain may be for sale",
    "buy this domain",
    "domain is parked",
    "parked free",
    "parked domain",
    "domain parking",
    "sedoparking",
    "parkingcrew",
    "bodis.com",
    "hugedomains",
    "dan.com",
];

const CONSTRUCTION_MARKERS: &[&str] = &[
    "under construction",
    "coming soon",
    "site is being built",
    "website is being built",
    "launching soon",
    "we'll be back soon",
    "under maintenance",
    "default web page",
    "welcome to nginx",
    "apache2 default page",
    "it works!",
];

/// Classify a fetched homepage by its visible text and raw markup.
pub fn classify_page(html: &str) -> DomainStatus {
    let markup = html.to_lowercase();
    let text = visible_text(&Html::parse_document(html)).to_lowercase();

    if PARKED_MARKERS.iter().any(|marker| markup.contains(marker)) {
        DomainStatus::Parked
    } else if CONSTRUCTION_MARKERS.iter().any(|marker| text.contains(marker)) {
        DomainStatus::UnderConstruction
    } else {
        DomainStatus::Live
    }
}

#[async_trait]
impl StatusProbe for SiteExtractor {
    async fn probe(&self, url: &str) -> TaskResult<DomainStatus> {
        let url = canonicalize(url)?;
        match self.pages.page(url.as_str()).await {
            Ok(page) => Ok(classify_page(&page.body)),
            Err(FetchError::Network(_) | FetchError::Timeout(_)) => Ok(DomainStatus::Unreachable),
            Err(FetchError::Status(code)) if code >= 500 => Ok(DomainStatus::Unreachable),
            Err(FetchError::Status(_)) => Ok(DomainStatus::Live),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parked_page() {
        let html = "<html><body><h1>example.com</h1><p>This domain is for sale!</p></body></html>";
        assert_eq!(classify_page(html), DomainStatus::Parked);

        let html = r#"<html><head><script src="https://www.sedoparking.com/js/x.js"></script></head></html>"#;
        assert_eq!(classify_page(html), DomainStatus::Parked);
    }

    #[test]
    fn test_under_construction_page() {
        let html = "<html><body><h1>Coming Soon</h1><p>Our new site launches in May.</p></body></html>";
        assert_eq!(classify_page(html), DomainStatus::UnderConstruction);
    }

    #[test]
    fn test_construction_marker_in_script_is_ignored() {
        let html = "<html><body><p>Fresh bread daily</p><script>var banner = 'coming soon';</script></body></html>";
        assert_eq!(classify_page(html), DomainStatus::Live);
    }
}
