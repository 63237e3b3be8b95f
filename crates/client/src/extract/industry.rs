//! Keyword-based industry classification.
//!
//! Two independent verdicts are produced: one from the page metadata text
//! and one from the domain name. Each score is the share of keyword hits
//! that went to the winning label.

use async_trait::async_trait;
use siteprofile_core::TaskResult;
use siteprofile_core::extractors::IndustryClassifier;
use siteprofile_core::model::{Classification, IndustryClassification, Metadata};

use crate::fetch::{canonicalize, url::bare_host};

/// Keywords at least this long also match as word prefixes ("invest" in
/// "investments"); shorter ones must match a whole word.
const MIN_STEM_LEN: usize = 5;

/// Label used when no keyword matched.
pub const UNKNOWN: &str = "Unknown";

const INDUSTRIES: &[(&str, &[&str])] = &[
    ("Food and Beverage", &["restaurant", "bakery", "cafe", "coffee", "food", "wine", "brewery", "catering", "pizza", "menu"]),
    ("Retail", &["shop", "store", "boutique", "fashion", "clothing", "apparel", "shoes", "jewelry", "outlet"]),
    ("Technology", &["software", "tech", "cloud", "app", "digital", "data", "cyber", "developer", "saas", "ai"]),
    ("Finance", &["bank", "finance", "insurance", "invest", "capital", "loan", "credit", "wealth", "accounting"]),
    ("Healthcare", &["health", "medical", "clinic", "pharmacy", "dental", "hospital", "care", "wellness", "doctor"]),
    ("Education", &["school", "academy", "university", "college", "learning", "education", "tutor", "course"]),
    ("Real Estate", &["property", "realty", "estate", "homes", "housing", "apartments", "rental"]),
    ("Travel and Hospitality", &["travel", "hotel", "tour", "holiday", "resort", "lodge", "booking", "safari"]),
    ("Automotive", &["auto", "car", "motors", "vehicle", "garage", "tyre", "tire"]),
    ("Construction", &["construction", "building", "builder", "plumbing", "electrical", "roofing", "contractor"]),
    ("Legal", &["law", "legal", "attorney", "lawyer", "solicitor", "advocate"]),
    ("Media and Entertainment", &["news", "media", "music", "film", "studio", "entertainment", "radio", "magazine"]),
    ("Agriculture", &["farm", "agri", "garden", "seed", "livestock", "organic"]),
];

/// Classifier that needs no network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Verdict over the words of free text.
    pub fn classify_text(&self, text: &str) -> Classification {
        let text = text.to_lowercase();
        let words: Vec<&str> = text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
        best(|keyword| {
            words
                .iter()
                .filter(|word| **word == keyword || (keyword.len() >= MIN_STEM_LEN && word.starts_with(keyword)))
                .count()
        })
    }

    /// Verdict over a host name, where words are usually run together.
    pub fn classify_domain(&self, host: &str) -> Classification {
        let host = host.to_lowercase();
        let name = host.rsplit_once('.').map(|(name, _)| name).unwrap_or(&host);
        best(|keyword| usize::from(keyword.len() > 3 && name.contains(keyword)) + usize::from(name.split(['-', '.']).any(|part| part == keyword)))
    }
}

fn best(hits: impl Fn(&str) -> usize) -> Classification {
    let scores: Vec<(&str, usize)> = INDUSTRIES
        .iter()
        .map(|(label, keywords)| (*label, keywords.iter().map(|keyword| hits(keyword)).sum()))
        .collect();
    let total: usize = scores.iter().map(|(_, score)| score).sum();

    match scores.into_iter().max_by_key(|(_, score)| *score) {
        Some((label, score)) if score > 0 => {
            Classification { label: label.to_string(), score: ((score as f64 / total as f64) * 100.0).round() / 100.0 }
        }
        _ => Classification { label: UNKNOWN.to_string(), score: 0.0 },
    }
}

#[async_trait]
impl IndustryClassifier for KeywordClassifier {
    async fn classify(&self, url: &str, metadata: &Metadata) -> TaskResult<IndustryClassification> {
        let host = bare_host(&canonicalize(url)?);
        let text = [
            &metadata.title,
            &metadata.description,
            &metadata.keywords,
            &metadata.og_title,
            &metadata.og_description,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

        Ok(IndustryClassification { metadata_class: self.classify_text(&text), domain_class: self.classify_domain(&host) })
    }
}
