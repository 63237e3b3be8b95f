//! Error types for siteprofile.
//!
//! Two shapes live here:
//! - [`Error`]: infrastructure failures (cache database, serialization,
//!   invalid task graphs). These never reach a scrape caller directly.
//! - [`ErrorOutcome`]: a failure carried as data in place of a task's
//!   payload. Every extractor returns [`TaskResult`].

use rmcp::model::{ErrorCode, ErrorData as McpError};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite;

/// Infrastructure errors for siteprofile.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cache entry found for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A record could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The task graph failed validation.
    #[error("INVALID_GRAPH: {0}")]
    InvalidGraph(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(e) => (-32603, e.to_string()),
            Error::InvalidGraph(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

/// Result shape of every extraction task.
pub type TaskResult<T> = Result<T, ErrorOutcome>;

/// A tagged failure returned in place of a successful payload.
///
/// This is data, not control flow: the orchestrator either records it
/// against a degraded field or, for the robots gate, returns it as the
/// sole result of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{code} ({status_code}): {message}")]
pub struct ErrorOutcome {
    pub status_code: u16,
    pub code: String,
    pub message: String,
}

impl ErrorOutcome {
    pub const INVALID_URL: &'static str = "INVALID_URL";
    pub const ROBOTS_DISALLOWED: &'static str = "ROBOTS_DISALLOWED";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const EXTRACT_FAILED: &'static str = "EXTRACT_FAILED";
    pub const TASK_PANICKED: &'static str = "TASK_PANICKED";
    pub const UNEXPECTED_SHAPE: &'static str = "UNEXPECTED_SHAPE";
    pub const INTERNAL: &'static str = "INTERNAL";
    pub const RENDER_DISABLED: &'static str = "RENDER_DISABLED";
    pub const UPSTREAM_ERROR: &'static str = "UPSTREAM_ERROR";
    pub const ROBOTS_UNREACHABLE: &'static str = "ROBOTS_UNREACHABLE";
    pub const TIMEOUT: &'static str = "TIMEOUT";

    pub fn new(status_code: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status_code, code: code.into(), message: message.into() }
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::new(400, Self::INVALID_URL, message)
    }

    pub fn disallowed(message: impl Into<String>) -> Self {
        Self::new(403, Self::ROBOTS_DISALLOWED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, Self::NOT_FOUND, message)
    }

    pub fn extract_failed(message: impl Into<String>) -> Self {
        Self::new(422, Self::EXTRACT_FAILED, message)
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(500, Self::TASK_PANICKED, message)
    }

    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::new(500, Self::UNEXPECTED_SHAPE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, Self::INTERNAL, message)
    }

    pub fn render_disabled() -> Self {
        Self::new(501, Self::RENDER_DISABLED, "screenshot capture requires the render feature")
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(502, Self::UPSTREAM_ERROR, message)
    }

    pub fn robots_unreachable(message: impl Into<String>) -> Self {
        Self::new(502, Self::ROBOTS_UNREACHABLE, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(504, Self::TIMEOUT, message)
    }
}

impl From<Error> for ErrorOutcome {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ErrorOutcome::new(400, "INVALID_INPUT", msg),
            Error::CacheMiss(msg) => ErrorOutcome::not_found(msg),
            other => ErrorOutcome::internal(other.to_string()),
        }
    }
}

impl From<ErrorOutcome> for McpError {
    fn from(outcome: ErrorOutcome) -> Self {
        let code = match outcome.status_code {
            400 => -32602,
            403 => -32005,
            404 => -32001,
            501 => -32011,
            504 => -32006,
            502 => -32008,
            _ => -32000,
        };
        let data = serde_json::to_value(&outcome).ok();

        McpError { code: ErrorCode(code), message: outcome.to_string().into(), data }
    }
}
