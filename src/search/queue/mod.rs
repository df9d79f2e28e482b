//! Write-coalescing queue for search index mutations
//!
//! Data-store write hooks push per-record mutations into the queue; the
//! queue batches them and sends one bulk request per quiet period, while
//! index resets bypass batching entirely.
//!
//! # Architecture
//!
//! - `types` - Mutations, document locators, and timing constants
//! - `timer` - Re-armable flush timer driven by a background task
//! - `bulk` - Encoding of a drained batch into a bulk payload
//! - `reset` - Index reset state machine with bounded retry
//! - `stats` - Lock-free statistics tracking
//! - `service` - The queue itself: enqueue, flush, reset, reconfigure
//!
//! # Example
//!
//! ```ignore
//! use kodegen_tools_indexsync::config::SyncConfig;
//! use kodegen_tools_indexsync::search::queue::{CoalescingQueue, DocumentLocator, Mutation};
//!
//! let config = SyncConfig::builder().es_host("http://localhost:9200").build()?;
//! let queue = CoalescingQueue::connect(&config)?;
//!
//! queue.enqueue(Mutation::delete(DocumentLocator::new(config.es_index(), "Order", "17")));
//! queue.reset_index(config.es_index()).await?;
//! ```

pub mod bulk;
pub mod reset;
pub mod service;
pub mod stats;
pub mod timer;
pub mod types;

pub use bulk::encode_batch;
pub use reset::{ResetExecutor, ResetReport, ResetState};
pub use service::{CoalescingQueue, Enqueued, FlushOutcome, QueueSettings, ResetHandle};
pub use stats::{QueueStats, QueueStatsSnapshot};
pub use timer::FlushTimer;
pub use types::{
    DEBOUNCE_WINDOW_MS, Document, DocumentLocator, MAX_BUFFER_DELAY_MS, MAX_BUFFER_FACTOR,
    Mutation, MutationKind, RESET_BACKOFF_MS, RESET_MAX_ATTEMPTS,
};
