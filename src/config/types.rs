//! Core configuration types for index synchronization
//!
//! This module contains the main `SyncConfig` struct and the constructors
//! that read it from a JSON settings document.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::search::errors::{SyncError, SyncResult};
use crate::search::queue::types::{
    DEBOUNCE_WINDOW_MS, MAX_BUFFER_DELAY_MS, RESET_BACKOFF_MS, RESET_MAX_ATTEMPTS,
};

/// Index used when the settings do not name one
pub const DEFAULT_INDEX: &str = "app_index";

/// Main configuration struct for index synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Elasticsearch address, e.g. `http://localhost:9200`
    ///
    /// A host without a scheme is treated as `http://`.
    pub(crate) es_host: String,

    /// Index every record is written to
    pub(crate) es_index: String,

    /// Emit bulk results ("Indexed x/y") at info level
    #[serde(alias = "logging")]
    pub(crate) log_results: bool,

    /// Quiet period after the latest mutation before a flush fires
    ///
    /// Default: 2000 ms
    pub(crate) debounce_ms: u64,

    /// Longest time the oldest buffered mutation waits under sustained writes
    ///
    /// Must be at least `debounce_ms`. Default: 10000 ms
    pub(crate) max_buffer_delay_ms: u64,

    /// Attempts an index reset makes before giving up
    ///
    /// Default: 5
    pub(crate) reset_max_attempts: u32,

    /// Fixed delay between reset attempts
    ///
    /// Default: 1000 ms
    pub(crate) reset_backoff_ms: u64,

    /// Timeout for each HTTP request to the search engine
    ///
    /// Default: 30 seconds
    pub(crate) request_timeout_secs: u64,

    /// Only these collections are synchronized
    pub(crate) whitelist: Option<Vec<String>>,

    /// These collections are never synchronized
    pub(crate) blacklist: Option<Vec<String>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            es_host: String::new(),
            es_index: DEFAULT_INDEX.to_string(),
            log_results: false,
            debounce_ms: DEBOUNCE_WINDOW_MS,
            max_buffer_delay_ms: MAX_BUFFER_DELAY_MS,
            reset_max_attempts: RESET_MAX_ATTEMPTS,
            reset_backoff_ms: RESET_BACKOFF_MS,
            request_timeout_secs: 30,
            whitelist: None,
            blacklist: None,
        }
    }
}

// Constructors
impl SyncConfig {
    /// Parse and validate a JSON settings document
    ///
    /// Unknown keys (such as a models path used by other tooling) are ignored.
    /// A missing `es_host` is an error rather than a silent default.
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        let config: SyncConfig = serde_json::from_str(json)
            .map_err(|e| SyncError::ConfigurationInvalid(format!("Malformed settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON settings file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigurationInvalid(format!(
                "Cannot read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }
}
