//! Bulk payload encoding for flushed batches
//!
//! Index mutations become a directive followed by the document body. Delete
//! directives stand alone: a body after a delete would shift every following
//! directive/body pair in the request.

use crate::search::client::{BulkDirective, BulkEntry, BulkOperation};

use super::types::Mutation;

/// Encode a batch of buffered mutations, preserving batch order
///
/// Resets never sit in a batch; one that slips through is skipped with a warning.
#[must_use]
pub fn encode_batch(batch: Vec<Mutation>) -> Vec<BulkEntry> {
    let mut entries = Vec::with_capacity(batch.len() * 2);

    for mutation in batch {
        match mutation {
            Mutation::Index { target, document } => {
                entries.push(BulkEntry::Directive(BulkDirective {
                    operation: BulkOperation::Index,
                    target,
                }));
                entries.push(BulkEntry::Body(document));
            }
            Mutation::Delete { target } => {
                entries.push(BulkEntry::Directive(BulkDirective {
                    operation: BulkOperation::Delete,
                    target,
                }));
            }
            Mutation::Reset { index_name } => {
                tracing::warn!(index = %index_name, "Reset found in flush batch, skipping");
            }
        }
    }

    entries
}
