//! Mutation types and constants for the coalescing queue
//!
//! This module defines the mutations accepted by the queue and the timing
//! constants that govern batching.

use serde_json::{Map, Value};
use std::fmt;

/// Quiet period after the most recent enqueue before a flush fires
pub const DEBOUNCE_WINDOW_MS: u64 = 2000;

/// Cap on buffering, as a multiple of the debounce window
pub const MAX_BUFFER_FACTOR: u64 = 5;

/// Maximum time the oldest buffered mutation may wait for a flush
pub const MAX_BUFFER_DELAY_MS: u64 = DEBOUNCE_WINDOW_MS * MAX_BUFFER_FACTOR;

/// Attempts an index reset makes before giving up
pub const RESET_MAX_ATTEMPTS: u32 = 5;

/// Fixed delay between reset attempts
pub const RESET_BACKOFF_MS: u64 = 1000;

/// JSON document body sent with an index directive
pub type Document = Map<String, Value>;

/// Location of one document in the search engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentLocator {
    index_name: String,
    collection_name: String,
    document_id: String,
}

impl DocumentLocator {
    /// Build a locator; the collection name is lower-cased as the engine requires
    pub fn new(
        index_name: impl Into<String>,
        collection_name: impl AsRef<str>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            collection_name: collection_name.as_ref().to_lowercase(),
            document_id: document_id.into(),
        }
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

impl fmt::Display for DocumentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.index_name, self.collection_name, self.document_id
        )
    }
}

/// Discriminant of a [`Mutation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Index,
    Delete,
    Reset,
}

/// A single requested index-affecting change
///
/// The variant shapes carry the payload rules: deletes never have a body and
/// resets name only the index they wipe.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Index or replace a document
    Index {
        target: DocumentLocator,
        document: Document,
    },
    /// Remove a document
    Delete { target: DocumentLocator },
    /// Destroy and recreate a whole index
    Reset { index_name: String },
}

impl Mutation {
    pub fn index(target: DocumentLocator, document: Document) -> Self {
        Mutation::Index { target, document }
    }

    pub fn delete(target: DocumentLocator) -> Self {
        Mutation::Delete { target }
    }

    pub fn reset(index_name: impl Into<String>) -> Self {
        Mutation::Reset {
            index_name: index_name.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Index { .. } => MutationKind::Index,
            Mutation::Delete { .. } => MutationKind::Delete,
            Mutation::Reset { .. } => MutationKind::Reset,
        }
    }

    /// Document locator, absent for resets
    #[must_use]
    pub fn target(&self) -> Option<&DocumentLocator> {
        match self {
            Mutation::Index { target, .. } | Mutation::Delete { target } => Some(target),
            Mutation::Reset { .. } => None,
        }
    }

    /// Index the mutation operates on
    #[must_use]
    pub fn index_name(&self) -> &str {
        match self {
            Mutation::Index { target, .. } | Mutation::Delete { target } => target.index_name(),
            Mutation::Reset { index_name } => index_name,
        }
    }
}
