//! Record lifecycle hooks
//!
//! The data store's after-save and after-destroy callbacks call into
//! [`RecordHooks`], which turns each record change into a queue mutation.
//! Hooks never fail the write that triggered them; problems are logged.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Display;

use crate::config::SyncConfig;

use super::queue::{CoalescingQueue, DocumentLocator, Enqueued, Mutation};

/// Which collections the hooks forward to the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CollectionFilter {
    #[default]
    All,
    /// Only these collections
    Whitelist(HashSet<String>),
    /// Every collection except these
    Blacklist(HashSet<String>),
}

impl CollectionFilter {
    pub fn whitelist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CollectionFilter::Whitelist(lowercase_set(names))
    }

    pub fn blacklist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CollectionFilter::Blacklist(lowercase_set(names))
    }

    /// Names compare case-insensitively
    #[must_use]
    pub fn allows(&self, collection: &str) -> bool {
        let name = collection.to_lowercase();
        match self {
            CollectionFilter::All => true,
            CollectionFilter::Whitelist(names) => names.contains(&name),
            CollectionFilter::Blacklist(names) => !names.contains(&name),
        }
    }
}

fn lowercase_set<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect()
}

/// Adapter between data-store write hooks and the coalescing queue
#[derive(Debug, Clone)]
pub struct RecordHooks {
    queue: CoalescingQueue,
    index_name: String,
    filter: CollectionFilter,
}

impl RecordHooks {
    pub fn new(queue: CoalescingQueue, index_name: impl Into<String>, filter: CollectionFilter) -> Self {
        Self {
            queue,
            index_name: index_name.into(),
            filter,
        }
    }

    /// Hooks targeting the configured index with the configured filter
    pub fn from_config(queue: CoalescingQueue, config: &SyncConfig) -> Self {
        Self::new(queue, config.es_index(), config.collection_filter())
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    #[must_use]
    pub fn watches(&self, collection: &str) -> bool {
        self.filter.allows(collection)
    }

    /// Record created or updated; returns whether a mutation was buffered
    pub fn after_save<T>(&self, collection: &str, id: impl Display, record: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        if !self.watches(collection) {
            return false;
        }

        let locator = DocumentLocator::new(self.index_name.as_str(), collection, id.to_string());
        let document = match serde_json::to_value(record) {
            Ok(Value::Object(document)) => document,
            Ok(other) => {
                tracing::warn!(
                    document = %locator,
                    kind = json_kind(&other),
                    "Record did not serialize to a JSON object, skipping"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(document = %locator, error = %e, "Record serialization failed, skipping");
                return false;
            }
        };

        self.submit(Mutation::index(locator, document))
    }

    /// Record destroyed; returns whether a mutation was buffered
    pub fn after_destroy(&self, collection: &str, id: impl Display) -> bool {
        if !self.watches(collection) {
            return false;
        }
        let locator = DocumentLocator::new(self.index_name.as_str(), collection, id.to_string());
        self.submit(Mutation::delete(locator))
    }

    fn submit(&self, mutation: Mutation) -> bool {
        matches!(self.queue.enqueue(mutation), Enqueued::Buffered { .. })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
