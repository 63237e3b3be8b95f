//! Scrape record data model.
//!
//! Field names serialize in camelCase, which is the persisted cache form
//! and the shape returned to callers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ErrorOutcome;

/// Input of a scrape; the URL is also the cache identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeRequest {
    /// Absolute `http(s)://` URL of the site to profile.
    pub url: String,
}

/// A field of [`ScrapeRecord`] produced by exactly one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Robots,
    DomainStatus,
    Metadata,
    IndustryClassification,
    Logo,
    Images,
    Screenshot,
    ContactInfo,
    Addresses,
    SeoAnalysis,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Robots,
        Field::DomainStatus,
        Field::Metadata,
        Field::IndustryClassification,
        Field::Logo,
        Field::Images,
        Field::Screenshot,
        Field::ContactInfo,
        Field::Addresses,
        Field::SeoAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Robots => "robots",
            Field::DomainStatus => "domainStatus",
            Field::Metadata => "metadata",
            Field::IndustryClassification => "industryClassification",
            Field::Logo => "logo",
            Field::Images => "images",
            Field::Screenshot => "screenshot",
            Field::ContactInfo => "contactInfo",
            Field::Addresses => "addresses",
            Field::SeoAnalysis => "seoAnalysis",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    /// Accepts camelCase, snake_case and kebab-case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.as_str().to_lowercase() == normalized)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// Outcome of the robots compliance gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsPolicy {
    /// Whether the requested URL may be scraped at all.
    pub allowed: bool,
    /// Canonical origin of the site, e.g. `https://example.com`.
    pub base_url: String,
    /// Disallow rules applying to our user agent.
    pub disallowed_paths: Vec<String>,
    /// Crawl-delay in seconds, if declared.
    pub crawl_delay: Option<f64>,
}

impl RobotsPolicy {
    /// Check a path against the disallow prefixes.
    ///
    /// Rules ending in `$` must match the whole path.
    pub fn is_path_allowed(&self, path: &str) -> bool {
        if !self.allowed {
            return false;
        }
        let path = if path.is_empty() { "/" } else { path };
        !self.disallowed_paths.iter().any(|rule| match rule.strip_suffix('$') {
            Some(exact) => path == exact,
            None => !rule.is_empty() && path.starts_with(rule.as_str()),
        })
    }
}

/// Liveness classification of a domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Live,
    Parked,
    UnderConstruction,
    Unreachable,
    #[default]
    Unknown,
}

/// Page metadata. The all-`None` value is the degraded form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

/// A single classifier verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

/// Industry guesses from page metadata and from the domain name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryClassification {
    pub metadata_class: Classification,
    pub domain_class: Classification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
    pub social_links: BTreeSet<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.social_links.is_empty()
    }
}

/// Result of one SEO check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoCheck {
    pub passed: bool,
    /// Measured value, e.g. a title length or an image count.
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl SeoCheck {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self { passed: true, detail: detail.into(), recommendation: None }
    }

    pub fn fail(detail: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self { passed: false, detail: detail.into(), recommendation: Some(recommendation.into()) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub title_tag: SeoCheck,
    pub meta_description: SeoCheck,
    pub headings: SeoCheck,
    pub image_alt_text: SeoCheck,
    pub content_quality: SeoCheck,
    pub internal_links: SeoCheck,
    pub structured_data: SeoCheck,
    pub indexability: SeoCheck,
    pub canonical_tag: SeoCheck,
    pub xml_sitemap: SeoCheck,
    pub site_speed: SeoCheck,
}

impl SeoAnalysis {
    /// Number of checks that passed.
    pub fn score(&self) -> usize {
        [
            &self.title_tag,
            &self.meta_description,
            &self.headings,
            &self.image_alt_text,
            &self.content_quality,
            &self.internal_links,
            &self.structured_data,
            &self.indexability,
            &self.canonical_tag,
            &self.xml_sitemap,
            &self.site_speed,
        ]
        .iter()
        .filter(|check| check.passed)
        .count()
    }
}

/// Payload of one task, tagged with the field it fills.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Robots(RobotsPolicy),
    DomainStatus(DomainStatus),
    Metadata(Metadata),
    IndustryClassification(IndustryClassification),
    Logo(String),
    Images(Vec<String>),
    Screenshot(String),
    ContactInfo(ContactInfo),
    Addresses(Vec<String>),
    SeoAnalysis(SeoAnalysis),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Robots(_) => Field::Robots,
            FieldValue::DomainStatus(_) => Field::DomainStatus,
            FieldValue::Metadata(_) => Field::Metadata,
            FieldValue::IndustryClassification(_) => Field::IndustryClassification,
            FieldValue::Logo(_) => Field::Logo,
            FieldValue::Images(_) => Field::Images,
            FieldValue::Screenshot(_) => Field::Screenshot,
            FieldValue::ContactInfo(_) => Field::ContactInfo,
            FieldValue::Addresses(_) => Field::Addresses,
            FieldValue::SeoAnalysis(_) => Field::SeoAnalysis,
        }
    }

    /// JSON form of the bare payload, as it appears inside a record.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            FieldValue::Robots(v) => serde_json::to_value(v),
            FieldValue::DomainStatus(v) => serde_json::to_value(v),
            FieldValue::Metadata(v) => serde_json::to_value(v),
            FieldValue::IndustryClassification(v) => serde_json::to_value(v),
            FieldValue::Logo(v) | FieldValue::Screenshot(v) => serde_json::to_value(v),
            FieldValue::Images(v) | FieldValue::Addresses(v) => serde_json::to_value(v),
            FieldValue::ContactInfo(v) => serde_json::to_value(v),
            FieldValue::SeoAnalysis(v) => serde_json::to_value(v),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Aggregated profile of a website.
///
/// Degraded fields hold their type's empty value; the failure that caused
/// it is listed under `errors` keyed by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRecord {
    pub url: String,
    pub domain_status: DomainStatus,
    pub robots: RobotsPolicy,
    pub metadata: Metadata,
    pub industry_classification: Option<IndustryClassification>,
    pub logo: String,
    pub images: Vec<String>,
    pub contact_info: ContactInfo,
    pub addresses: Vec<String>,
    pub screenshot: String,
    pub seo_analysis: Option<SeoAnalysis>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<Field, ErrorOutcome>,
    pub elapsed_seconds: f64,
}

impl ScrapeRecord {
    /// A record with every field at its empty value.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            domain_status: DomainStatus::Unknown,
            robots: RobotsPolicy::default(),
            metadata: Metadata::default(),
            industry_classification: None,
            logo: String::new(),
            images: Vec::new(),
            contact_info: ContactInfo::default(),
            addresses: Vec::new(),
            screenshot: String::new(),
            seo_analysis: None,
            errors: BTreeMap::new(),
            elapsed_seconds: 0.0,
        }
    }

    /// Fields that degraded during the run that built this record.
    pub fn degraded_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }
}
