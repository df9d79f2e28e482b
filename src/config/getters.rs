//! Getter methods for `SyncConfig`
//!
//! Raw values plus the derived types the queue and hooks consume.

use std::time::Duration;

use crate::search::errors::RetryConfig;
use crate::search::hooks::CollectionFilter;
use crate::search::queue::QueueSettings;

use super::types::SyncConfig;

impl SyncConfig {
    #[must_use]
    pub fn es_host(&self) -> &str {
        &self.es_host
    }

    #[must_use]
    pub fn es_index(&self) -> &str {
        &self.es_index
    }

    #[must_use]
    pub fn log_results(&self) -> bool {
        self.log_results
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn max_buffer_delay(&self) -> Duration {
        Duration::from_millis(self.max_buffer_delay_ms)
    }

    /// Fixed-backoff policy for index resets
    #[must_use]
    pub fn reset_retry(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.reset_max_attempts,
            Duration::from_millis(self.reset_backoff_ms),
        )
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn whitelist(&self) -> Option<&[String]> {
        self.whitelist.as_deref()
    }

    #[must_use]
    pub fn blacklist(&self) -> Option<&[String]> {
        self.blacklist.as_deref()
    }

    /// Whitelist wins if both lists are present
    #[must_use]
    pub fn collection_filter(&self) -> CollectionFilter {
        match (&self.whitelist, &self.blacklist) {
            (Some(names), _) => CollectionFilter::whitelist(names),
            (None, Some(names)) => CollectionFilter::blacklist(names),
            (None, None) => CollectionFilter::All,
        }
    }

    #[must_use]
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            debounce: self.debounce(),
            max_buffer_delay: self.max_buffer_delay(),
            log_results: self.log_results,
            reset_retry: self.reset_retry(),
        }
    }
}
