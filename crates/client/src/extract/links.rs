//! Link harvesting from HTML documents.

use scraper::Html;
use std::collections::HashSet;
use url::Url;

use super::{element_text, selector};
use crate::fetch::resolve;

/// A harvested link with text and href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link text content
    pub text: String,
    /// Resolved href URL
    pub href: String,
}

impl Link {
    /// Whether the link stays on the same host as `base`.
    pub fn is_internal(&self, base: &Url) -> bool {
        Url::parse(&self.href).is_ok_and(|url| url.host_str() == base.host_str())
    }
}

/// Extract `http(s)` links from a document, resolved against `base_url`
/// and deduplicated by href in document order.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let anchors = selector("a[href]");
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href").and_then(|href| resolve(base_url, href)) else {
            continue;
        };
        if !seen.insert(href.clone()) {
            continue;
        }

        let text = element_text(element);
        let text = if text.is_empty() { "[link]".to_string() } else { text };
        links.push(Link { text, href });
    }

    links
}

/// Raw `href` values with the given scheme prefix, e.g. `mailto:` or `tel:`.
pub fn scheme_hrefs(document: &Html, scheme: &str) -> Vec<String> {
    let anchors = selector("a[href]");
    document
        .select(&anchors)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            let prefix = href.get(..scheme.len())?;
            prefix.eq_ignore_ascii_case(scheme).then(|| href[scheme.len()..].to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/path/").unwrap()
    }

    #[test]
    fn test_extract_links_relative_and_duplicate() {
        let document = Html::parse_document(
            r#"<body>
                <a href="/about">About</a>
                <a href="contact">Contact</a>
                <a href="/about">About again</a>
                <a href="https://twitter.com/example"></a>
            </body>"#,
        );
        let links = extract_links(&document, &base());

        assert_eq!(links.len(), 3);
        assert_eq!(links[0], Link { text: "About".into(), href: "https://example.com/about".into() });
        assert_eq!(links[1].href, "https://example.com/path/contact");
        assert_eq!(links[2].text, "[link]");
    }

    #[test]
    fn test_extract_links_skips_non_web_schemes() {
        let document = Html::parse_document(
            r#"<a href="mailto:hi@example.com">Mail</a><a href="javascript:void(0)">JS</a><a href="tel:+15550100">Call</a>"#,
        );
        assert!(extract_links(&document, &base()).is_empty());
    }

    #[test]
    fn test_is_internal() {
        let link = Link { text: "x".into(), href: "https://example.com/a".into() };
        assert!(link.is_internal(&base()));
        let link = Link { text: "x".into(), href: "https://other.com/a".into() };
        assert!(!link.is_internal(&base()));
    }

    #[test]
    fn test_scheme_hrefs() {
        let document = Html::parse_document(
            r#"<a href="MAILTO:hi@example.com">Mail</a><a href="tel:+1 555 0100">Call</a><a href="/x">x</a>"#,
        );
        assert_eq!(scheme_hrefs(&document, "mailto:"), vec!["hi@example.com".to_string()]);
        assert_eq!(scheme_hrefs(&document, "tel:"), vec!["+1 555 0100".to_string()]);
    }
}
