//! Search index synchronization for a relational data store
//!
//! Keeps an Elasticsearch index in step with record writes by buffering
//! per-record mutations in a write-coalescing queue and sending them as
//! bulk requests, with a retrying destroy-and-recreate path for full resets.

pub mod config;
pub mod search;

pub use config::{SyncConfig, SyncConfigBuilder};
pub use search::{
    BulkSummary, CoalescingQueue, CollectionFilter, DocumentLocator, ElasticsearchClient,
    Enqueued, FlushOutcome, Mutation, MutationKind, QueueSettings, RecordHooks, RecordSource,
    Reindexer, ResetReport, SearchClient, SyncError, SyncResult, initialize_sync,
};
