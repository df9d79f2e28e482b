//! Search engine client interface
//!
//! The queue talks to the search engine only through [`SearchClient`]. The
//! production implementation is [`ElasticsearchClient`](super::elasticsearch::ElasticsearchClient);
//! tests substitute recording doubles.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::errors::SyncResult;
use super::queue::types::{Document, DocumentLocator};

/// Bulk directive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Index,
    Delete,
}

impl BulkOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BulkOperation::Index => "index",
            BulkOperation::Delete => "delete",
        }
    }
}

/// One operation descriptor inside a bulk request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDirective {
    pub operation: BulkOperation,
    pub target: DocumentLocator,
}

#[derive(Serialize)]
struct DirectiveMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    collection: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

impl BulkDirective {
    /// Wire form: `{"<operation>": {"_index": .., "_type": .., "_id": ..}}`
    pub fn to_value(&self) -> SyncResult<Value> {
        let meta = DirectiveMeta {
            index: self.target.index_name(),
            collection: self.target.collection_name(),
            id: self.target.document_id(),
        };
        let mut line = Map::with_capacity(1);
        line.insert(
            self.operation.as_str().to_string(),
            serde_json::to_value(meta)?,
        );
        Ok(Value::Object(line))
    }
}

/// Element of an encoded bulk payload
#[derive(Debug, Clone, PartialEq)]
pub enum BulkEntry {
    Directive(BulkDirective),
    Body(Document),
}

impl BulkEntry {
    #[must_use]
    pub fn as_directive(&self) -> Option<&BulkDirective> {
        match self {
            BulkEntry::Directive(directive) => Some(directive),
            BulkEntry::Body(_) => None,
        }
    }
}

/// Count directives in an encoded payload
#[must_use]
pub fn directive_count(entries: &[BulkEntry]) -> usize {
    entries
        .iter()
        .filter(|entry| entry.as_directive().is_some())
        .count()
}

/// Serialize a bulk payload as newline-delimited JSON
pub fn encode_ndjson(entries: &[BulkEntry]) -> SyncResult<String> {
    let mut body = String::with_capacity(entries.len() * 128);
    for entry in entries {
        let line = match entry {
            BulkEntry::Directive(directive) => serde_json::to_string(&directive.to_value()?)?,
            BulkEntry::Body(document) => serde_json::to_string(document)?,
        };
        body.push_str(&line);
        body.push('\n');
    }
    Ok(body)
}

/// Result of one directive inside a bulk request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemOutcome {
    pub operation: BulkOperation,
    pub document_id: String,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItemOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Transport-level success of a bulk request, with per-directive outcomes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResponse {
    pub took_ms: Option<u64>,
    pub items: Vec<BulkItemOutcome>,
}

impl BulkResponse {
    #[must_use]
    pub fn summary(&self) -> BulkSummary {
        let succeeded = self.items.iter().filter(|item| item.is_success()).count();
        BulkSummary {
            succeeded,
            total: self.items.len(),
        }
    }

    /// Outcomes for directives that failed individually
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().filter(|item| !item.is_success())
    }
}

/// `succeeded/total` count for a bulk request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BulkSummary {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    /// Some directives failed while the request itself went through
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        self.succeeded < self.total
    }
}

impl fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.succeeded, self.total)
    }
}

/// Operations the synchronizer needs from a search engine
///
/// Implementations must be cheap to share; the queue holds them behind an
/// `Arc` and clones that handle at the start of every operation.
pub trait SearchClient: Send + Sync {
    /// Send an ordered bulk payload in one request
    fn bulk_write<'a>(&'a self, entries: &'a [BulkEntry]) -> BoxFuture<'a, SyncResult<BulkResponse>>;

    /// Check whether an index exists
    fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<bool>>;

    /// Delete an index; `IndexNotFound` when it does not exist
    fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>>;

    /// Create an empty index; `IndexAlreadyExists` when it exists
    fn create_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, SyncResult<()>>;
}
