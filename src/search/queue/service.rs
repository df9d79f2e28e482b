//! Coalescing queue
//!
//! Buffers per-record mutations and sends them as one bulk request once
//! input has been quiet for the debounce window. The oldest buffered
//! mutation never waits longer than the maximum buffer delay, so a steady
//! stream of writes still flushes periodically. Resets bypass the buffer:
//! they discard everything pending and run the reset executor right away.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::RwLockReadGuard;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::search::client::{BulkResponse, BulkSummary, SearchClient, directive_count};
use crate::search::elasticsearch::ElasticsearchClient;
use crate::search::errors::{RetryConfig, SyncError, SyncResult};

use super::bulk::encode_batch;
use super::reset::{ResetExecutor, ResetReport};
use super::stats::{QueueStats, QueueStatsSnapshot};
use super::timer::FlushTimer;
use super::types::{
    DEBOUNCE_WINDOW_MS, MAX_BUFFER_DELAY_MS, Mutation, RESET_BACKOFF_MS, RESET_MAX_ATTEMPTS,
};

/// Timing and logging settings for a queue
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Quiet period after the latest enqueue before flushing
    pub debounce: Duration,
    /// Longest time the oldest buffered mutation may wait
    pub max_buffer_delay: Duration,
    /// Emit bulk results at info level
    pub log_results: bool,
    /// Retry policy for index resets
    pub reset_retry: RetryConfig,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEBOUNCE_WINDOW_MS),
            max_buffer_delay: Duration::from_millis(MAX_BUFFER_DELAY_MS),
            log_results: false,
            reset_retry: RetryConfig::fixed(
                RESET_MAX_ATTEMPTS,
                Duration::from_millis(RESET_BACKOFF_MS),
            ),
        }
    }
}

/// What `enqueue` did with a mutation
#[derive(Debug)]
pub enum Enqueued {
    /// Appended to the pending batch
    Buffered { pending: usize },
    /// Pending batch discarded and a reset started
    Reset(ResetHandle),
    /// Queue is shut down; the mutation was dropped
    Rejected,
}

/// Handle to a reset started by `enqueue`
#[derive(Debug)]
pub struct ResetHandle {
    index: String,
    discarded: usize,
    join: JoinHandle<SyncResult<ResetReport>>,
}

impl ResetHandle {
    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Number of buffered mutations the reset discarded
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Wait for the reset to finish
    pub async fn wait(self) -> SyncResult<ResetReport> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::Other(format!(
                "Reset task for index '{}' did not complete: {e}",
                self.index
            ))),
        }
    }
}

/// Result of a flush
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing was pending; no request was made
    Empty,
    /// Bulk request went through; some directives may still have failed
    Sent(BulkSummary),
    /// Bulk request failed; the batch is not re-queued
    Dropped { directives: usize, error: SyncError },
    /// A reset is running; the buffer is flushed once it completes
    Deferred { pending: usize },
}

#[derive(Debug, Default)]
struct PendingState {
    mutations: Vec<Mutation>,
    oldest: Option<Instant>,
    timer_armed: bool,
    resets_in_flight: usize,
    closed: bool,
}

struct QueueInner {
    state: Mutex<PendingState>,
    client: RwLock<Arc<dyn SearchClient>>,
    log_results: AtomicBool,
    settings: QueueSettings,
    timer: FlushTimer,
    runtime: Handle,
    // Shared by bulk sends, exclusive for resets
    gate: Arc<tokio::sync::RwLock<()>>,
    stats: Arc<QueueStats>,
}

/// Write-coalescing queue for one search engine connection
///
/// Cloning is cheap and every clone feeds the same buffer.
#[derive(Clone)]
pub struct CoalescingQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for CoalescingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingQueue")
            .field("pending", &self.pending_len())
            .field("log_results", &self.log_results())
            .finish()
    }
}

impl CoalescingQueue {
    /// Create a queue around an existing client
    ///
    /// Must be called within a tokio runtime. The flush timer and every
    /// reset run on that runtime, so the queue can then be fed from any thread.
    pub fn new(client: Arc<dyn SearchClient>, settings: QueueSettings) -> Self {
        let runtime = Handle::current();
        let inner = Arc::new_cyclic(|weak: &Weak<QueueInner>| {
            let weak = weak.clone();
            let timer = FlushTimer::spawn(move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.flush().await;
                    }
                }
            });

            QueueInner {
                state: Mutex::new(PendingState::default()),
                client: RwLock::new(client),
                log_results: AtomicBool::new(settings.log_results),
                settings,
                timer,
                runtime,
                gate: Arc::new(tokio::sync::RwLock::new(())),
                stats: Arc::new(QueueStats::new()),
            }
        });

        Self { inner }
    }

    /// Create a queue talking to the Elasticsearch host in `config`
    pub fn connect(config: &SyncConfig) -> SyncResult<Self> {
        let client = ElasticsearchClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), config.queue_settings()))
    }

    /// Accept one mutation
    ///
    /// Index and delete mutations are buffered and (re)arm the flush timer.
    /// A reset discards the whole buffer and starts the reset executor before
    /// returning; both happen under the buffer lock, so no concurrent enqueue
    /// can slip in between.
    pub fn enqueue(&self, mutation: Mutation) -> Enqueued {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.closed {
            inner.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(kind = ?mutation.kind(), "Queue is shut down, dropping mutation");
            return Enqueued::Rejected;
        }

        match mutation {
            Mutation::Reset { index_name } => {
                let discarded = state.mutations.len();
                state.mutations.clear();
                state.oldest = None;
                state.timer_armed = false;
                state.resets_in_flight += 1;
                inner.timer.cancel();

                inner
                    .stats
                    .discarded_by_reset
                    .fetch_add(discarded, Ordering::Relaxed);
                tracing::info!(index = %index_name, discarded, "Reset requested, pending mutations discarded");

                let join = inner.spawn_reset(index_name.clone());
                Enqueued::Reset(ResetHandle {
                    index: index_name,
                    discarded,
                    join,
                })
            }
            mutation => {
                let kind = mutation.kind();
                let now = Instant::now();
                state.mutations.push(mutation);
                let deadline = inner.arm_flush(&mut state, now);

                inner.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                let pending = state.mutations.len();
                tracing::debug!(
                    kind = ?kind,
                    pending,
                    flush_in_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                    "Mutation buffered"
                );
                Enqueued::Buffered { pending }
            }
        }
    }

    /// Drain the buffer and send it as one bulk request
    ///
    /// Normally invoked by the timer. Issues no request when nothing is
    /// pending. A flush never overlaps a reset: mutations buffered while a
    /// reset is pending stay buffered (`Deferred`) and are sent after it.
    pub async fn flush(&self) -> FlushOutcome {
        self.inner.flush().await
    }

    /// Send `batch` right away as one bulk request, bypassing the buffer
    ///
    /// Pending mutations stay buffered. Used for bulk loads that must not
    /// wait for the debounce window.
    pub async fn send_batch(&self, batch: Vec<Mutation>) -> FlushOutcome {
        self.inner.send(batch).await
    }

    /// Reset `index` through the queue and wait for the outcome
    pub async fn reset_index(&self, index: &str) -> SyncResult<ResetReport> {
        match self.enqueue(Mutation::reset(index)) {
            Enqueued::Reset(handle) => handle.wait().await,
            Enqueued::Rejected => Err(SyncError::QueueClosed),
            Enqueued::Buffered { .. } => Err(SyncError::Other(format!(
                "Reset of index '{index}' was buffered instead of executed"
            ))),
        }
    }

    /// Create `index` if it does not exist yet; returns whether it was created
    pub async fn ensure_index(&self, index: &str) -> SyncResult<bool> {
        let executor = ResetExecutor::new(self.client(), self.inner.settings.reset_retry.clone());
        executor.ensure(index).await
    }

    /// Stop accepting mutations and flush whatever is pending
    pub async fn shutdown(&self) -> FlushOutcome {
        self.inner.state.lock().closed = true;
        tracing::info!("Coalescing queue shutting down");
        self.inner.flush().await
    }

    /// Swap the search engine client and logging flag from a new configuration
    ///
    /// Operations already in flight finish against the client they started
    /// with; anything issued after this call uses the new one.
    pub fn reconfigure(&self, config: &SyncConfig) -> SyncResult<()> {
        let client = ElasticsearchClient::from_config(config)?;
        self.change_client(Arc::new(client));
        self.change_log_setting(config.log_results());
        Ok(())
    }

    /// Replace the search engine client
    pub fn change_client(&self, client: Arc<dyn SearchClient>) {
        *self.inner.client.write() = client;
        tracing::info!("Search engine client replaced");
    }

    /// Turn result logging on or off
    pub fn change_log_setting(&self, log_results: bool) {
        self.inner.log_results.store(log_results, Ordering::Relaxed);
    }

    #[must_use]
    pub fn log_results(&self) -> bool {
        self.inner.log_results.load(Ordering::Relaxed)
    }

    /// Number of buffered mutations
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().mutations.len()
    }

    /// Whether a flush is scheduled
    #[must_use]
    pub fn is_timer_armed(&self) -> bool {
        self.inner.state.lock().timer_armed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    #[must_use]
    pub fn settings(&self) -> &QueueSettings {
        &self.inner.settings
    }

    /// Get current queue statistics
    #[must_use]
    pub fn stats(&self) -> QueueStatsSnapshot {
        self.inner.stats.snapshot()
    }

    fn client(&self) -> Arc<dyn SearchClient> {
        self.inner.client()
    }
}

impl QueueInner {
    fn client(&self) -> Arc<dyn SearchClient> {
        self.client.read().clone()
    }

    /// Schedule the next flush for the current buffer; returns the deadline
    fn arm_flush(&self, state: &mut PendingState, now: Instant) -> Instant {
        let oldest = *state.oldest.get_or_insert(now);
        let deadline = (now + self.settings.debounce).min(oldest + self.settings.max_buffer_delay);
        self.timer.arm_at(deadline);
        state.timer_armed = true;
        deadline
    }

    /// Start a reset task; called with the buffer lock held
    fn spawn_reset(self: &Arc<Self>, index: String) -> JoinHandle<SyncResult<ResetReport>> {
        let executor = ResetExecutor::new(self.client(), self.settings.reset_retry.clone());
        let inner = Arc::clone(self);
        // Take the gate now when possible so later flushes queue behind this reset
        let early_guard = Arc::clone(&self.gate).try_write_owned().ok();

        self.runtime.spawn(async move {
            let _exclusive = match early_guard {
                Some(guard) => guard,
                None => Arc::clone(&inner.gate).write_owned().await,
            };

            let result = executor.run(&index).await;
            match &result {
                Ok(_) => inner.stats.resets_completed.fetch_add(1, Ordering::Relaxed),
                Err(_) => inner.stats.resets_failed.fetch_add(1, Ordering::Relaxed),
            };
            inner.finish_reset();
            result
        })
    }

    /// Release a reset's hold on the buffer; runs with the gate held exclusively
    fn finish_reset(&self) {
        let mut state = self.state.lock();
        state.resets_in_flight = state.resets_in_flight.saturating_sub(1);
        if state.resets_in_flight == 0 && !state.mutations.is_empty() {
            self.arm_flush(&mut state, Instant::now());
        }
    }

    async fn flush(&self) -> FlushOutcome {
        // Held from drain to send so a reset cannot slip in between
        let shared = self.gate.read().await;

        let batch = {
            let mut state = self.state.lock();
            state.timer_armed = false;
            self.timer.cancel();
            if state.resets_in_flight > 0 {
                let pending = state.mutations.len();
                tracing::debug!(pending, "Reset in progress, flush deferred");
                return FlushOutcome::Deferred { pending };
            }
            state.oldest = None;
            std::mem::take(&mut state.mutations)
        };

        self.send_shared(batch, shared).await
    }

    async fn send(&self, batch: Vec<Mutation>) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }
        let shared = self.gate.read().await;
        self.send_shared(batch, shared).await
    }

    async fn send_shared(
        &self,
        batch: Vec<Mutation>,
        _shared: RwLockReadGuard<'_, ()>,
    ) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let client = self.client();
        let entries = encode_batch(batch);
        let directives = directive_count(&entries);

        let result = client.bulk_write(&entries).await;
        self.record_bulk_result(directives, result)
    }

    fn record_bulk_result(
        &self,
        directives: usize,
        result: SyncResult<BulkResponse>,
    ) -> FlushOutcome {
        let log_results = self.log_results.load(Ordering::Relaxed);

        match result {
            Ok(response) => {
                let summary = response.summary();
                self.stats.batches_flushed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .directives_sent
                    .fetch_add(summary.succeeded, Ordering::Relaxed);
                self.stats
                    .directives_failed
                    .fetch_add(summary.failed(), Ordering::Relaxed);

                for failure in response.failures() {
                    tracing::debug!(
                        operation = failure.operation.as_str(),
                        document_id = %failure.document_id,
                        status = failure.status,
                        error = failure.error.as_deref().unwrap_or(""),
                        "Bulk directive failed"
                    );
                }

                if log_results {
                    tracing::info!(
                        succeeded = summary.succeeded,
                        total = summary.total,
                        took_ms = ?response.took_ms,
                        "Indexed {summary} documents"
                    );
                }
                FlushOutcome::Sent(summary)
            }
            Err(error) => {
                self.stats.batches_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    directives,
                    error = %error,
                    "Bulk request failed, batch dropped"
                );
                FlushOutcome::Dropped { directives, error }
            }
        }
    }
}
