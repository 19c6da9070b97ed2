//! In-memory [`DocumentStore`] implementation for deterministic tests.
//!
//! Uses `BTreeMap` behind `std::sync::RwLock` for thread safety and stable
//! iteration order. Semantics (merge, noop detection, unknown-index errors)
//! match the SQLite backend because both share the helpers in
//! [`super`](crate::store).

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::mappings::IndexSpec;

use super::{content_hash, merge_document, DocumentStore, Filter, UpsertOutcome};

struct StoredDoc {
    doc: Value,
    content_hash: String,
}

/// In-memory store for tests and embedding the pipeline in other tools.
pub struct MemoryStore {
    indices: RwLock<HashMap<String, IndexSpec>>,
    docs: RwLock<BTreeMap<(String, String), StoredDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            docs: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StorageError> {
        let mut indices = self.indices.write().unwrap();
        indices.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<UpsertOutcome, StorageError> {
        let spec = {
            let indices = self.indices.read().unwrap();
            indices
                .get(index)
                .cloned()
                .ok_or_else(|| StorageError::UnknownIndex(index.to_string()))?
        };

        let mut docs = self.docs.write().unwrap();
        let key = (index.to_string(), id.to_string());
        let existing = docs.get(&key);

        let mut merged = merge_document(existing.map(|s| &s.doc), doc);
        spec.normalize_document(&mut merged);
        let hash = content_hash(&merged)?;

        match existing {
            Some(stored) if stored.content_hash == hash => Ok(UpsertOutcome::Noop),
            Some(_) => {
                docs.insert(
                    key,
                    StoredDoc {
                        doc: merged,
                        content_hash: hash,
                    },
                );
                Ok(UpsertOutcome::Updated)
            }
            None => {
                docs.insert(
                    key,
                    StoredDoc {
                        doc: merged,
                        content_hash: hash,
                    },
                );
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .get(&(index.to_string(), id.to_string()))
            .map(|s| s.doc.clone()))
    }

    async fn query(&self, index: &str, filter: &Filter) -> Result<Vec<Value>, StorageError> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .iter()
            .filter(|((idx, _), _)| idx == index)
            .map(|(_, stored)| &stored.doc)
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }
}
