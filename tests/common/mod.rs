//! Test utilities shared by the index synchronization test suite

use futures::future::BoxFuture;
use kodegen_tools_indexsync::search::client::{
    BulkEntry, BulkItemOutcome, BulkOperation, BulkResponse, SearchClient,
};
use kodegen_tools_indexsync::search::queue::{CoalescingQueue, QueueSettings};
use kodegen_tools_indexsync::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[allow(dead_code)]
pub const INDEX: &str = "app_index";

/// A bulk request as the client received it
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedBulk {
    pub at: Instant,
    pub entries: Vec<BulkEntry>,
}

#[allow(dead_code)]
impl RecordedBulk {
    pub fn directive_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.as_directive().is_some())
            .count()
    }

    /// `(operation, document id)` of every directive, in payload order
    pub fn directives(&self) -> Vec<(BulkOperation, String)> {
        self.entries
            .iter()
            .filter_map(BulkEntry::as_directive)
            .map(|d| (d.operation, d.target.document_id().to_string()))
            .collect()
    }
}

/// In-memory search client that records every call
#[derive(Debug)]
pub struct RecordingClient {
    calls: Mutex<Vec<String>>,
    bulks: Mutex<Vec<RecordedBulk>>,
    exists: AtomicBool,
    fail_index_ops: AtomicBool,
    fail_bulk: AtomicBool,
    failing_deletes: AtomicUsize,
    rejected_ids: Mutex<HashSet<String>>,
    held_bulk: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            bulks: Mutex::new(Vec::new()),
            exists: AtomicBool::new(true),
            fail_index_ops: AtomicBool::new(false),
            fail_bulk: AtomicBool::new(false),
            failing_deletes: AtomicUsize::new(0),
            rejected_ids: Mutex::new(HashSet::new()),
            held_bulk: Mutex::new(None),
        })
    }

    /// Every index lifecycle call fails as unavailable
    pub fn fail_index_ops(&self, fail: bool) {
        self.fail_index_ops.store(fail, Ordering::SeqCst);
    }

    /// Every bulk request fails as unavailable
    pub fn fail_bulk(&self, fail: bool) {
        self.fail_bulk.store(fail, Ordering::SeqCst);
    }

    /// The next `count` deletes fail as unavailable
    pub fn fail_next_deletes(&self, count: usize) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    pub fn set_exists(&self, exists: bool) {
        self.exists.store(exists, Ordering::SeqCst);
    }

    /// Directives for this document id come back with status 400
    pub fn reject_document(&self, id: &str) {
        self.rejected_ids.lock().insert(id.to_string());
    }

    /// The next bulk request stays open until the returned handle is notified
    ///
    /// A held request records `"bulk done"` once released.
    pub fn hold_next_bulk(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.held_bulk.lock() = Some(Arc::clone(&release));
        release
    }

    /// Index lifecycle calls and bulk requests, in the order received
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn bulks(&self) -> Vec<RecordedBulk> {
        self.bulks.lock().clone()
    }

    pub fn bulk_count(&self) -> usize {
        self.bulks.lock().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn unavailable(&self) -> SyncResult<()> {
        if self.fail_index_ops.load(Ordering::SeqCst) {
            return Err(SyncError::TransientUnavailable("connection refused".into()));
        }
        Ok(())
    }
}

impl SearchClient for RecordingClient {
    fn bulk_write<'a>(&'a self, entries: &'a [BulkEntry]) -> BoxFuture<'a, SyncResult<BulkResponse>> {
        Box::pin(async move {
            self.record("bulk".to_string());
            let held = self.held_bulk.lock().take();
            if let Some(release) = held {
                release.notified().await;
                self.record("bulk done".to_string());
            }
            if self.fail_bulk.load(Ordering::SeqCst) {
                return Err(SyncError::TransientUnavailable("connection refused".into()));
            }
            self.bulks.lock().push(RecordedBulk {
                at: Instant::now(),
                entries: entries.to_vec(),
            });

            let rejected = self.rejected_ids.lock();
            let items = entries
                .iter()
                .filter_map(BulkEntry::as_directive)
                .map(|directive| {
                    let id = directive.target.document_id().to_string();
                    let reject = rejected.contains(&id);
                    BulkItemOutcome {
                        operation: directive.operation,
                        status: match (reject, directive.operation) {
                            (true, _) => 400,
                            (false, BulkOperation::Index) => 201,
                            (false, BulkOperation::Delete) => 200,
                        },
                        error: reject.then(|| "mapper_parsing_exception".to_string()),
                        document_id: id,
                    }
                })
                .collect();

            Ok(BulkResponse {
                took_ms: Some(1),
                items,
            })
        })
    }

    fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<bool>> {
        Box::pin(async move {
            self.record(format!("exists {index}"));
            self.unavailable()?;
            Ok(self.exists.load(Ordering::SeqCst))
        })
    }

    fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            self.record(format!("delete {index}"));
            self.unavailable()?;
            let failing = self.failing_deletes.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_deletes.store(failing - 1, Ordering::SeqCst);
                return Err(SyncError::TransientUnavailable("delete timed out".into()));
            }
            if !self.exists.swap(false, Ordering::SeqCst) {
                return Err(SyncError::IndexNotFound(index.to_string()));
            }
            Ok(())
        })
    }

    fn create_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            self.record(format!("create {index}"));
            self.unavailable()?;
            if self.exists.swap(true, Ordering::SeqCst) {
                return Err(SyncError::IndexAlreadyExists(index.to_string()));
            }
            Ok(())
        })
    }
}

/// Route library logs to the test output; `RUST_LOG` overrides the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Queue with default timing around a recording client
#[allow(dead_code)]
pub fn recording_queue() -> (CoalescingQueue, Arc<RecordingClient>) {
    init_tracing();
    let client = RecordingClient::new();
    let queue = CoalescingQueue::new(client.clone(), QueueSettings::default());
    (queue, client)
}
