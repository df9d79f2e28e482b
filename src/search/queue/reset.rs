//! Index reset executor
//!
//! A reset walks `Checking -> Deleting -> Creating -> Done`. Any retryable
//! failure restarts the whole walk from `Checking` after the configured
//! backoff; the steps are not individually safe to resume after an unknown
//! partial failure. When the attempts run out the reset ends `Failed` and
//! the error is returned to the caller.

use std::sync::Arc;

use crate::search::client::SearchClient;
use crate::search::errors::{RetryConfig, SyncError, SyncResult};
use crate::search::runtime_helpers::retry_task;

/// Step of a reset attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    Checking,
    Deleting,
    Creating,
    Done,
    Failed,
}

/// Outcome of a completed reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub index: String,
    /// Attempts used, 1-based
    pub attempts: u32,
    /// Whether the index existed (and was deleted) on the successful attempt
    pub existed: bool,
}

/// Destroys and recreates an index with bounded retry
#[derive(Clone)]
pub struct ResetExecutor {
    client: Arc<dyn SearchClient>,
    retry: RetryConfig,
}

impl ResetExecutor {
    pub fn new(client: Arc<dyn SearchClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Reset `index`, retrying the full sequence on retryable failures
    pub async fn run(&self, index: &str) -> SyncResult<ResetReport> {
        let mut attempts = 0u32;

        let result = retry_task(&self.retry, |attempt| {
            attempts = attempt;
            self.attempt(index, attempt)
        })
        .await;

        match result {
            Ok(existed) => {
                tracing::info!(index, attempts, existed, "Index reset complete");
                Ok(ResetReport {
                    index: index.to_string(),
                    attempts,
                    existed,
                })
            }
            Err(e) => {
                tracing::error!(
                    index,
                    attempts,
                    state = ?ResetState::Failed,
                    error = %e,
                    "Index reset abandoned"
                );
                Err(SyncError::ResetFailed {
                    index: index.to_string(),
                    attempts,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Create `index` if it is missing; returns whether it was created
    pub async fn ensure(&self, index: &str) -> SyncResult<bool> {
        retry_task(&self.retry, |_| async move {
            if self.client.index_exists(index).await? {
                return Ok(false);
            }
            match self.client.create_index(index).await {
                Ok(()) => Ok(true),
                // Someone else created it between the check and the create
                Err(SyncError::IndexAlreadyExists(_)) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn attempt(&self, index: &str, attempt: u32) -> SyncResult<bool> {
        let mut state = ResetState::Checking;
        let mut existed = false;

        loop {
            tracing::debug!(index, attempt, state = ?state, "Reset step");

            let step = match state {
                ResetState::Checking => self.client.index_exists(index).await.map(|exists| {
                    existed = exists;
                    if exists {
                        ResetState::Deleting
                    } else {
                        ResetState::Creating
                    }
                }),
                ResetState::Deleting => match self.client.delete_index(index).await {
                    Ok(()) | Err(SyncError::IndexNotFound(_)) => Ok(ResetState::Creating),
                    Err(e) => Err(e),
                },
                ResetState::Creating => self
                    .client
                    .create_index(index)
                    .await
                    .map(|()| ResetState::Done),
                ResetState::Done => return Ok(existed),
                ResetState::Failed => {
                    return Err(SyncError::Other(format!("reset of '{index}' already failed")));
                }
            };

            state = match step {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(index, attempt, state = ?state, error = %e, "Reset step failed");
                    return Err(e);
                }
            };
        }
    }
}
