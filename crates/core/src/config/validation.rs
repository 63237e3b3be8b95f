//! Configuration validation rules.

use crate::config::{AppConfig, CacheBackend};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for out-of-range values and
    /// `ConfigError::Missing` when the SQLite backend has no path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }
        if self.task_timeout_ms < 100 {
            return Err(invalid("task_timeout_ms", "must be at least 100ms"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.max_images == 0 {
            return Err(invalid("max_images", "must be at least 1"));
        }
        if self.cache_ttl_seconds == Some(0) {
            return Err(invalid("cache_ttl_seconds", "must be greater than 0 when set"));
        }
        if self.cache_max_entries == Some(0) {
            return Err(invalid("cache_max_entries", "must be at least 1 when set"));
        }

        if self.cache_backend == CacheBackend::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set SITEPROFILE_DB_PATH or use SITEPROFILE_CACHE_BACKEND=memory".into(),
            });
        }

        if self.task_timeout_ms < self.timeout_ms {
            tracing::warn!(
                task_timeout_ms = self.task_timeout_ms,
                timeout_ms = self.timeout_ms,
                "task timeout is shorter than the HTTP timeout; slow fetches will surface as task timeouts"
            );
        }

        Ok(())
    }
}
