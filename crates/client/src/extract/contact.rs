//! Emails, phone numbers and social profiles.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::ContactFinder;
use siteprofile_core::model::{ContactInfo, RobotsPolicy};
use url::Url;

use super::links::scheme_hrefs;
use super::{SiteExtractor, extract_links, visible_text};
use crate::fetch::url::bare_host;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("invalid email pattern"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").expect("invalid phone pattern"));

/// Hosts whose links count as social profiles.
const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
];

/// Asset suffixes that look like emails in `name@2x.png` style file names.
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

fn is_email(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    !ASSET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Phone numbers carry between 7 and 15 digits.
fn normalize_phone(candidate: &str) -> Option<String> {
    let digits = candidate.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits).then(|| candidate.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn is_social(link: &str) -> bool {
    Url::parse(link).is_ok_and(|url| {
        let host = bare_host(&url);
        SOCIAL_HOSTS.iter().any(|social| host == *social || host.ends_with(&format!(".{social}")))
    })
}

/// Collect contact details from a page's text, `mailto:`/`tel:` links and
/// outbound social links.
pub fn parse_contact_info(html: &str, base: &Url) -> ContactInfo {
    let document = Html::parse_document(html);
    let text = visible_text(&document);

    let mut emails: BTreeSet<String> =
        EMAIL.find_iter(&text).map(|m| m.as_str().to_lowercase()).filter(|email| is_email(email)).collect();
    for href in scheme_hrefs(&document, "mailto:") {
        let address = href.split('?').next().unwrap_or_default().trim().to_lowercase();
        if EMAIL.is_match(&address) {
            emails.insert(address);
        }
    }

    let mut phones: BTreeSet<String> = PHONE.find_iter(&text).filter_map(|m| normalize_phone(m.as_str().trim())).collect();
    phones.extend(scheme_hrefs(&document, "tel:").iter().filter_map(|href| normalize_phone(href.trim())));

    let social_links = extract_links(&document, base)
        .into_iter()
        .map(|link| link.href)
        .filter(|href| is_social(href))
        .collect();

    ContactInfo { emails, phones, social_links }
}

#[async_trait]
impl ContactFinder for SiteExtractor {
    async fn find_contact_info(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<ContactInfo> {
        let page = self.allowed_page(url, robots).await?;
        Ok(parse_contact_info(&page.body, &page.final_url))
    }
}
