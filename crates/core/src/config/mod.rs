//! Application configuration with layered loading.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if SITEPROFILE_CONFIG_FILE set)
//! 3. Environment variables (SITEPROFILE_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Where scrape records are kept between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SITEPROFILE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache backend, `sqlite` or `memory`.
    ///
    /// Set via SITEPROFILE_CACHE_BACKEND environment variable.
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Record lifetime in seconds. Unset keeps records until purged.
    #[serde(default)]
    pub cache_ttl_seconds: Option<u64>,

    /// Upper bound on cached records for the memory backend.
    #[serde(default)]
    pub cache_max_entries: Option<usize>,

    /// User-Agent string for HTTP requests and robots.txt matching.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on a single extractor task in milliseconds.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// Maximum bytes to read per fetched page.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum image URLs reported per record.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Whether screenshots are captured with a headless browser.
    ///
    /// Set via SITEPROFILE_RENDER_ENABLED environment variable.
    #[serde(default)]
    pub render_enabled: bool,

    /// Serialize concurrent scrapes of the same URL so only one computes.
    #[serde(default)]
    pub single_flight: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./siteprofile-cache.sqlite")
}

fn default_user_agent() -> String {
    "siteprofile/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_task_timeout_ms() -> u64 {
    60_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_images() -> usize {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_backend: CacheBackend::default(),
            cache_ttl_seconds: None,
            cache_max_entries: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            task_timeout_ms: default_task_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_images: default_max_images(),
            render_enabled: false,
            single_flight: false,
        }
    }
}

impl AppConfig {
    /// HTTP timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_seconds.map(Duration::from_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITEPROFILE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITEPROFILE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
