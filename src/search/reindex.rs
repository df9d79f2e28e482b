//! Full re-index from the primary data store
//!
//! Recovery path for anything the incremental queue dropped: wipe the index
//! through the queue, then bulk-load every record of each collection.

use futures::future::{BoxFuture, join_all};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::client::BulkSummary;
use super::errors::{SyncError, SyncResult};
use super::hooks::CollectionFilter;
use super::queue::{CoalescingQueue, Document, DocumentLocator, FlushOutcome, Mutation};

/// One record pulled from the data store
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub document: Document,
}

/// Read access to the primary data store
///
/// Store errors are opaque to the synchronizer and surface as
/// [`SyncError::Other`] in the collection's report.
pub trait RecordSource: Send + Sync {
    /// Every collection the store knows about
    fn collections(&self) -> Vec<String>;

    /// All records of one collection
    fn fetch_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<SourceRecord>>>;
}

/// Per-collection outcome of a re-index
#[derive(Debug)]
pub struct CollectionReport {
    pub collection: String,
    pub result: SyncResult<BulkSummary>,
}

/// Rebuilds an index from a [`RecordSource`]
pub struct Reindexer<'a, S: RecordSource + ?Sized> {
    queue: &'a CoalescingQueue,
    source: &'a S,
    index_name: String,
    filter: CollectionFilter,
}

impl<'a, S: RecordSource + ?Sized> Reindexer<'a, S> {
    pub fn new(queue: &'a CoalescingQueue, source: &'a S, index_name: impl Into<String>) -> Self {
        Self {
            queue,
            source,
            index_name: index_name.into(),
            filter: CollectionFilter::All,
        }
    }

    /// Restrict the default collection list
    #[must_use]
    pub fn with_filter(mut self, filter: CollectionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Reset the index, then load `collections` (all allowed ones when empty)
    ///
    /// Fails only when the reset fails; per-collection problems are reported
    /// in the returned list.
    pub async fn run(&self, collections: &[String]) -> SyncResult<Vec<CollectionReport>> {
        let targets: Vec<String> = if collections.is_empty() {
            self.source
                .collections()
                .into_iter()
                .filter(|name| self.filter.allows(name))
                .collect()
        } else {
            collections.to_vec()
        };

        self.queue.reset_index(&self.index_name).await?;

        let total = targets.len();
        let completed = AtomicUsize::new(0);

        let reports = join_all(targets.into_iter().map(|collection| {
            let completed = &completed;
            async move {
                let result = self.load_collection(&collection).await;
                match &result {
                    Ok(summary) => {
                        tracing::info!(collection = %collection, "Indexed {summary} {collection} items");
                    }
                    Err(e) => {
                        tracing::error!(collection = %collection, error = %e, "Collection re-index failed");
                    }
                }
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!("{done}/{total} total collections complete");
                CollectionReport { collection, result }
            }
        }))
        .await;

        Ok(reports)
    }

    async fn load_collection(&self, collection: &str) -> SyncResult<BulkSummary> {
        let records = self.source.fetch_all(collection).await?;

        let batch = records
            .into_iter()
            .map(|record| {
                Mutation::index(
                    DocumentLocator::new(self.index_name.as_str(), collection, record.id),
                    record.document,
                )
            })
            .collect();

        match self.queue.send_batch(batch).await {
            FlushOutcome::Empty => Ok(BulkSummary::default()),
            FlushOutcome::Sent(summary) => Ok(summary),
            FlushOutcome::Dropped { error, .. } => Err(error),
            FlushOutcome::Deferred { .. } => Err(SyncError::Other(format!(
                "Bulk load of {collection} deferred by a running reset"
            ))),
        }
    }
}

impl CollectionReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(summary) if !summary.is_partial_failure())
    }

    /// Error when the collection failed outright
    #[must_use]
    pub fn error(&self) -> Option<&SyncError> {
        self.result.as_ref().err()
    }
}
