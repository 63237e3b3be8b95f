//! Scrape orchestration.
//!
//! A request is a small DAG of extractor tasks:
//!
//! ```text
//! robots ─┬─ metadata ─┬─ industryClassification
//!         │            └─ logo
//!         ├─ images, screenshot, contactInfo, addresses, seoAnalysis
//! domainStatus
//! ```
//!
//! [`TaskGraph`] validates and layers the nodes, [`Executor`] runs each
//! layer concurrently with per-node isolation, [`assemble`] folds the
//! outputs into a record and [`Orchestrator`] wraps it all with the cache.

pub mod aggregate;
pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod single_flight;
pub mod timing;

#[cfg(test)]
pub(crate) mod fakes;

pub use aggregate::assemble;
pub use executor::{ExecutionMode, Executor, TaskOutputs};
pub use graph::{FailurePolicy, GraphError, TaskGraph, TaskNode};
pub use orchestrator::{Orchestrator, PipelineConfig};
pub use single_flight::InFlight;
