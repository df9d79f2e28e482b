//! Search index synchronization
//!
//! This module keeps an Elasticsearch index in step with mutations in the
//! primary data store. Record hooks feed a write-coalescing queue that
//! batches index/delete operations into bulk requests; full resets and
//! re-indexing go through the same queue so they never interleave with
//! per-record writes.

pub mod client;
pub mod elasticsearch;
pub mod errors;
pub mod hooks;
pub mod queue;
pub mod reindex;
pub mod runtime_helpers;

pub use client::{
    BulkDirective, BulkEntry, BulkItemOutcome, BulkOperation, BulkResponse, BulkSummary,
    SearchClient,
};
pub use elasticsearch::ElasticsearchClient;
pub use errors::{RetryConfig, SyncError, SyncResult};
pub use hooks::{CollectionFilter, RecordHooks};
pub use queue::{
    CoalescingQueue, DocumentLocator, Enqueued, FlushOutcome, Mutation, MutationKind,
    QueueSettings, ResetExecutor, ResetReport,
};
pub use reindex::{CollectionReport, RecordSource, Reindexer};
pub use runtime_helpers::retry_task;

use crate::config::SyncConfig;

/// Connect a coalescing queue to the Elasticsearch host in `config`
pub fn initialize_sync(config: &SyncConfig) -> SyncResult<CoalescingQueue> {
    CoalescingQueue::connect(config)
}
