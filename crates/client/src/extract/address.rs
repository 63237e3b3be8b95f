//! Postal address extraction.
//!
//! Three sources are read in order: `<address>` elements, microdata
//! `itemprop="address"` nodes and JSON-LD `PostalAddress` objects. Results
//! are deduplicated preserving first appearance.

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::AddressFinder;
use siteprofile_core::model::RobotsPolicy;

use super::{SiteExtractor, element_text, selector};

const POSTAL_PARTS: &[&str] = &["streetAddress", "addressLocality", "addressRegion", "postalCode", "addressCountry"];

pub fn parse_addresses(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();

    found.extend(document.select(&selector("address")).map(element_text));
    found.extend(document.select(&selector("[itemprop=address]")).map(element_text));

    for script in document.select(&selector(r#"script[type="application/ld+json"]"#)) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => collect_postal(&value, &mut found),
            Err(e) => tracing::debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }

    let mut addresses: Vec<String> = Vec::new();
    for address in found {
        let address = address.trim().trim_end_matches(',').to_string();
        if !address.is_empty() && !addresses.contains(&address) {
            addresses.push(address);
        }
    }
    addresses
}

fn is_postal(object: &serde_json::Map<String, Value>) -> bool {
    match object.get("@type") {
        Some(Value::String(kind)) => kind == "PostalAddress",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some("PostalAddress")),
        _ => false,
    }
}

fn format_postal(object: &serde_json::Map<String, Value>) -> String {
    POSTAL_PARTS
        .iter()
        .filter_map(|part| match object.get(*part)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(country) => country.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn collect_postal(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(object) if is_postal(object) => found.push(format_postal(object)),
        Value::Object(object) => {
            for (key, child) in object {
                match child {
                    Value::String(address) if key == "address" => found.push(address.clone()),
                    _ => collect_postal(child, found),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_postal(item, found)),
        _ => {}
    }
}

#[async_trait]
impl AddressFinder for SiteExtractor {
    async fn find_addresses(&self, url: &str, robots: &RobotsPolicy) -> TaskResult<Vec<String>> {
        let page = self.allowed_page(url, robots).await?;
        Ok(parse_addresses(&page.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_element_and_microdata() {
        let html = r#"<body>
            <footer><address>12 Long Street,<br> Cape Town</address></footer>
            <div itemprop="address">1 Main St, Springfield</div>
            <address>12 Long Street, Cape Town</address>
        </body>"#;
        assert_eq!(parse_addresses(html), vec!["12 Long Street, Cape Town", "1 Main St, Springfield"]);
    }

    #[test]
    fn test_json_ld_postal_address() {
        let html = r#"<head><script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Bakery", "name": "Acme",
             "address": {"@type": "PostalAddress", "streetAddress": "5 Bree St",
                         "addressLocality": "Cape Town", "postalCode": "8001",
                         "addressCountry": {"@type": "Country", "name": "ZA"}}}
        </script></head>"#;
        assert_eq!(parse_addresses(html), vec!["5 Bree St, Cape Town, 8001, ZA"]);
    }

    #[test]
    fn test_json_ld_graph_and_malformed_block() {
        let html = r#"<head>
            <script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@graph": [{"@type": "Organization", "address": "9 Loop St"}]}</script>
        </head>"#;
        assert_eq!(parse_addresses(html), vec!["9 Loop St"]);
    }

    #[test]
    fn test_no_addresses() {
        assert!(parse_addresses("<p>No address here</p>").is_empty());
    }
}
