//! Runtime helper functions for async retry patterns
//!
//! This module provides the bounded retry loop used by multi-step engine
//! operations such as index resets.

use std::future::Future;

use super::errors::{RetryConfig, SyncResult};

/// Retry an operation with configurable retry logic
///
/// The operation receives the 1-based attempt number. It is run at most
/// `config.max_attempts` times; retryable errors (see
/// [`SyncError::is_retryable`](super::errors::SyncError::is_retryable)) sleep
/// for `config.delay_for_attempt` and start over, anything else is returned
/// immediately. When the attempts are exhausted the last error is returned.
pub async fn retry_task<F, Fut, T>(config: &RetryConfig, mut operation: F) -> SyncResult<T>
where
    F: FnMut(u32) -> Fut + Send,
    Fut: Future<Output = SyncResult<T>> + Send,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        attempts = attempt,
                        error = %e,
                        "Max retry attempts exceeded"
                    );
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt - 1);

                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable error, retrying after delay"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
