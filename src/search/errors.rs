//! Error types for index synchronization
//!
//! This module defines the error taxonomy shared by the coalescing queue,
//! the reset executor and the Elasticsearch client, together with the
//! retry configuration used for bounded retries.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Error types for synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Search engine unreachable or failing at connection level
    #[error("Search engine unavailable (retry recommended): {0}")]
    TransientUnavailable(String),

    /// Malformed or missing connection/index settings
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Index does not exist
    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    /// Index already exists
    #[error("Index '{0}' already exists")]
    IndexAlreadyExists(String),

    /// Search engine answered but refused the request
    #[error("Search engine rejected request (status {status}): {message}")]
    RequestRejected { status: u16, message: String },

    /// Search engine answered with something we could not interpret
    #[error("Malformed search engine response: {0}")]
    MalformedResponse(String),

    /// Index reset abandoned after exhausting its attempts
    #[error("Reset of index '{index}' failed after {attempts} attempts: {source}")]
    ResetFailed {
        index: String,
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// Queue no longer accepts mutations
    #[error("Coalescing queue is shut down")]
    QueueClosed,

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(error: anyhow::Error) -> Self {
        SyncError::Other(error.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            return SyncError::TransientUnavailable(error.to_string());
        }
        if let Some(status) = error.status() {
            return SyncError::RequestRejected {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        if error.is_decode() {
            return SyncError::MalformedResponse(error.to_string());
        }
        SyncError::TransientUnavailable(error.to_string())
    }
}

impl SyncError {
    /// Check if error is an availability failure
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::TransientUnavailable(_) | SyncError::Io(_) => true,
            SyncError::RequestRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if a multi-step operation should be restarted after this error
    ///
    /// Besides availability failures this includes `IndexAlreadyExists`: a
    /// third party recreated the index mid-reset, so the only safe move is to
    /// run the whole sequence again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_transient() || matches!(self, SyncError::IndexAlreadyExists(_))
    }
}

/// Retry configuration for engine operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Backoff multiplier (1.0 gives a fixed delay)
    pub backoff_multiplier: f64,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(5, Duration::from_millis(1000))
    }
}

impl RetryConfig {
    /// Fixed backoff: the same delay between every attempt
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Calculate delay after the given failed attempt (0-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (self.initial_delay.as_millis() as f64 * multiplier) as u64;
        let delay = Duration::from_millis(delay_ms);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }

    /// Upper bound on the time spent sleeping between attempts
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

/// Helper macro for logging search engine calls with timing
#[macro_export]
macro_rules! log_engine_call {
    ($op:expr, $operation:expr, $target:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(
                    operation = $operation,
                    resource = %$target,
                    duration_ms = duration.as_millis(),
                    "Search engine call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    operation = $operation,
                    resource = %$target,
                    duration_ms = duration.as_millis(),
                    error = %e,
                    "Search engine call failed"
                );
            }
        }

        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_detection() {
        assert!(SyncError::TransientUnavailable("down".into()).is_transient());
        assert!(
            SyncError::RequestRejected {
                status: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(
            !SyncError::RequestRejected {
                status: 400,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!SyncError::ConfigurationInvalid("x".into()).is_transient());
        assert!(SyncError::IndexAlreadyExists("app".into()).is_retryable());
        assert!(!SyncError::IndexAlreadyExists("app".into()).is_transient());
        assert!(!SyncError::IndexNotFound("app".into()).is_retryable());
    }

    #[test]
    fn foreign_errors_become_other() {
        let error: SyncError = anyhow::anyhow!("connection pool exhausted").into();
        assert!(matches!(error, SyncError::Other(ref message) if message == "connection pool exhausted"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn fixed_backoff_is_flat() {
        let config = RetryConfig::fixed(5, Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(250));
        assert_eq!(config.total_backoff(), Duration::from_millis(1000));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(300));
    }
}
