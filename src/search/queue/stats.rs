//! Lock-free statistics for the coalescing queue

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue statistics
#[derive(Debug, Default)]
pub struct QueueStats {
    pub enqueued: AtomicUsize,
    pub discarded_by_reset: AtomicUsize,
    pub rejected: AtomicUsize,
    pub batches_flushed: AtomicUsize,
    pub directives_sent: AtomicUsize,
    pub directives_failed: AtomicUsize,
    pub batches_dropped: AtomicUsize,
    pub resets_completed: AtomicUsize,
    pub resets_failed: AtomicUsize,
}

impl QueueStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of current statistics
    #[inline]
    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            discarded_by_reset: self.discarded_by_reset.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            directives_sent: self.directives_sent.load(Ordering::Relaxed),
            directives_failed: self.directives_failed.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            resets_completed: self.resets_completed.load(Ordering::Relaxed),
            resets_failed: self.resets_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub enqueued: usize,
    pub discarded_by_reset: usize,
    pub rejected: usize,
    pub batches_flushed: usize,
    pub directives_sent: usize,
    pub directives_failed: usize,
    pub batches_dropped: usize,
    pub resets_completed: usize,
    pub resets_failed: usize,
}
