//! Typed errors for the ingestion pipeline.
//!
//! The taxonomy mirrors how failures are recovered: a [`ValidationError`]
//! skips one record and the batch continues, a [`StorageError`] marks one
//! record failed during ingestion (or aborts a command that has no
//! per-record recovery, such as `init`). Attribute extraction has no error
//! type at all: it is a total function, and malformed rule overrides are
//! rejected at config load instead.

use thiserror::Error;

/// A record failed normalization and was skipped.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("mandatory field '{field}' is missing or blank")]
    MissingField { field: &'static str },
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// The storage backend rejected an operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("index '{0}' does not exist (run `cata init` first)")]
    UnknownIndex(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}
