//! Folding task outputs into a [`ScrapeRecord`].
//!
//! Each field is assigned by name from its own task; a failed or missing
//! task leaves the field at its empty value and records the outcome.

use crate::error::ErrorOutcome;
use crate::model::{Field, FieldValue, ScrapeRecord};

use super::executor::TaskOutputs;

/// Build a record from the outputs of a full run.
pub fn assemble(url: &str, outputs: TaskOutputs) -> ScrapeRecord {
    let mut record = ScrapeRecord::empty(url);
    let mut results = outputs.into_results();

    for field in Field::ALL {
        match results.remove(&field) {
            Some(Ok(value)) => apply(&mut record, value),
            Some(Err(outcome)) => {
                record.errors.insert(field, outcome);
            }
            None => {
                record
                    .errors
                    .insert(field, ErrorOutcome::internal(format!("no task produced {field}")));
            }
        }
    }

    record
}

fn apply(record: &mut ScrapeRecord, value: FieldValue) {
    match value {
        FieldValue::Robots(policy) => record.robots = policy,
        FieldValue::DomainStatus(status) => record.domain_status = status,
        FieldValue::Metadata(metadata) => record.metadata = metadata,
        FieldValue::IndustryClassification(classification) => {
            record.industry_classification = Some(classification);
        }
        FieldValue::Logo(logo) => record.logo = logo,
        FieldValue::Images(images) => record.images = images,
        FieldValue::Screenshot(screenshot) => record.screenshot = screenshot,
        FieldValue::ContactInfo(contact) => record.contact_info = contact,
        FieldValue::Addresses(addresses) => record.addresses = addresses,
        FieldValue::SeoAnalysis(analysis) => record.seo_analysis = Some(analysis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DomainStatus, Metadata, RobotsPolicy};

    #[test]
    fn test_assemble_assigns_by_field() {
        let mut outputs = TaskOutputs::default();
        outputs.insert((Field::Robots, Ok(FieldValue::Robots(RobotsPolicy { allowed: true, ..Default::default() }))));
        outputs.insert((Field::DomainStatus, Ok(FieldValue::DomainStatus(DomainStatus::Parked))));
        outputs.insert((Field::Logo, Ok(FieldValue::Logo("https://example.com/logo.svg".into()))));
        outputs.insert((Field::Images, Ok(FieldValue::Images(vec!["a.png".into()]))));

        let record = assemble("https://example.com", outputs);
        assert!(record.robots.allowed);
        assert_eq!(record.domain_status, DomainStatus::Parked);
        assert_eq!(record.logo, "https://example.com/logo.svg");
        assert_eq!(record.images, vec!["a.png".to_string()]);
        assert!(!record.errors.contains_key(&Field::Logo));
    }

    #[test]
    fn test_assemble_degrades_failed_fields() {
        let mut outputs = TaskOutputs::default();
        outputs.insert((Field::Metadata, Err(ErrorOutcome::upstream("status 503"))));
        outputs.insert((Field::Screenshot, Err(ErrorOutcome::render_disabled())));

        let record = assemble("https://example.com", outputs);
        assert_eq!(record.metadata, Metadata::default());
        assert_eq!(record.screenshot, "");
        assert_eq!(record.errors[&Field::Metadata].code, ErrorOutcome::UPSTREAM_ERROR);
        assert_eq!(record.errors[&Field::Screenshot].code, ErrorOutcome::RENDER_DISABLED);
    }

    #[test]
    fn test_assemble_flags_missing_tasks() {
        let record = assemble("https://example.com", TaskOutputs::default());
        assert_eq!(record.errors.len(), Field::ALL.len());
        assert_eq!(record.domain_status, DomainStatus::Unknown);
    }
}
