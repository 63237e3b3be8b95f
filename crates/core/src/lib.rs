//! Core types and the scrape pipeline for siteprofile.
//!
//! This crate provides:
//! - The scrape record data model and the [`ErrorOutcome`] failure shape
//! - Extractor capability traits the pipeline schedules
//! - The task graph executor and cache-aware [`Orchestrator`]
//! - Record caches (SQLite and in-memory)
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod model;
pub mod pipeline;

pub use cache::{CacheDb, CacheStore, MemoryCache, PurgeFilter};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::{Error, ErrorOutcome, TaskResult};
pub use extractors::Extractors;
pub use model::{Field, FieldValue, ScrapeRecord, ScrapeRequest};
pub use pipeline::{Orchestrator, PipelineConfig};
