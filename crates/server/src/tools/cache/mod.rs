//! Cache-related MCP tools.
//!
//! These work against whichever [`siteprofile_core::CacheStore`] backend the
//! server was started with.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
