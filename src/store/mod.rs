//! Storage abstraction for Catalog Harness.
//!
//! The [`DocumentStore`] trait defines the operations the ingestion
//! pipeline and report commands need from an indexed document store,
//! enabling pluggable backends (SQLite, in-memory for tests).
//!
//! Upserts follow doc-as-upsert semantics: the partial document is
//! shallow-merged over any existing document with the same id, so separate
//! pipelines (orders, returns) can each contribute their own fields to one
//! document. A write whose merged result is byte-identical to the stored
//! document reports [`UpsertOutcome::Noop`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`ensure_index`](DocumentStore::ensure_index) | Create/refresh a mapping-defined index |
//! | [`upsert`](DocumentStore::upsert) | Merge one document by id |
//! | [`bulk_upsert`](DocumentStore::bulk_upsert) | Merge a batch, per-document outcomes |
//! | [`get`](DocumentStore::get) | Fetch one document by id |
//! | [`query`](DocumentStore::query) | Fetch documents matching a filter |
//! | [`count`](DocumentStore::count) | Count documents matching a filter |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::mappings::IndexSpec;

/// Result of an upsert, mirroring the bulk-update result labels of the
/// original analytics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Noop,
}

/// Minimal filter DSL for read-side queries.
///
/// Deliberately small: the presentation layer owns anything richer. A term
/// filter against an array field matches when the array contains the value.
#[derive(Debug, Clone)]
pub enum Filter {
    MatchAll,
    Term(String, Value),
    Exists(String),
    Missing(String),
    All(Vec<Filter>),
}

impl Filter {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Term(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into())
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Filter::Missing(field.into())
    }

    /// Evaluate this filter against a document. Shared by all backends so
    /// query semantics cannot drift between them.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::Term(field, value) => match doc.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                Some(found) => found == value,
                None => false,
            },
            Filter::Exists(field) => matches!(doc.get(field), Some(v) if !v.is_null()),
            Filter::Missing(field) => !matches!(doc.get(field), Some(v) if !v.is_null()),
            Filter::All(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// Abstract indexed document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the index if missing, or refresh its stored mapping.
    /// Idempotent.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StorageError>;

    /// Shallow-merge `doc` into the document identified by `id`, creating
    /// it if absent. Fails with [`StorageError::UnknownIndex`] when the
    /// index was never ensured.
    async fn upsert(&self, index: &str, id: &str, doc: &Value)
        -> Result<UpsertOutcome, StorageError>;

    /// Upsert a batch, returning an outcome per document. One document's
    /// rejection does not stop the rest of the batch.
    async fn bulk_upsert(
        &self,
        index: &str,
        docs: &[(String, Value)],
    ) -> Result<Vec<(String, Result<UpsertOutcome, StorageError>)>, StorageError> {
        let mut outcomes = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            outcomes.push((id.clone(), self.upsert(index, id, doc).await));
        }
        Ok(outcomes)
    }

    /// Fetch one document by id.
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Fetch all documents matching the filter, ordered by id.
    async fn query(&self, index: &str, filter: &Filter) -> Result<Vec<Value>, StorageError>;

    /// Count documents matching the filter.
    async fn count(&self, index: &str, filter: &Filter) -> Result<u64, StorageError> {
        Ok(self.query(index, filter).await?.len() as u64)
    }
}

/// Shallow-merge a partial document over an existing one. Top-level fields
/// from `partial` win; existing fields absent from `partial` are preserved.
pub(crate) fn merge_document(existing: Option<&Value>, partial: &Value) -> Value {
    match (existing, partial) {
        (Some(Value::Object(current)), Value::Object(incoming)) => {
            let mut merged = current.clone();
            for (field, value) in incoming {
                merged.insert(field.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => partial.clone(),
    }
}

/// Content hash used for noop detection. Serialization of a JSON object is
/// key-ordered, so equal documents hash equally.
pub(crate) fn content_hash(doc: &Value) -> Result<String, StorageError> {
    let canonical = serde_json::to_string(doc)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
