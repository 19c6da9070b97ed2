//! SQLite-backed [`DocumentStore`].
//!
//! Documents are stored one JSON row per `(idx, id)` pair; index mappings
//! live in their own table so every process sees the same scaled-float
//! normalization. Uses WAL journal mode and `ON CONFLICT` upserts.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::Config;
use crate::error::StorageError;
use crate::mappings::IndexSpec;

use super::{content_hash, merge_document, DocumentStore, Filter, UpsertOutcome};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn connect(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("create {}: {}", parent.display(), e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Open the store configured in `[storage]`.
    pub async fn open(config: &Config) -> Result<Self, StorageError> {
        Self::connect(&config.storage.path).await
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Size of the database file on disk, if known.
    pub fn db_size(config: &Config) -> u64 {
        std::fs::metadata(&config.storage.path)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS indices (
                name TEXT PRIMARY KEY,
                mapping TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                idx TEXT NOT NULL,
                id TEXT NOT NULL,
                doc TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (idx, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_idx ON documents(idx)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load_spec(&self, index: &str) -> Result<Option<IndexSpec>, StorageError> {
        let mapping: Option<String> =
            sqlx::query_scalar("SELECT mapping FROM indices WHERE name = ?")
                .bind(index)
                .fetch_optional(&self.pool)
                .await?;
        match mapping {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Documents per index, for the stats command.
    pub async fn index_counts(&self) -> Result<Vec<(String, i64)>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT i.name AS name, COUNT(d.id) AS doc_count
            FROM indices i
            LEFT JOIN documents d ON d.idx = i.name
            GROUP BY i.name
            ORDER BY i.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("name"), row.get("doc_count")))
            .collect())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StorageError> {
        let mapping = serde_json::to_string(spec)?;
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO indices (name, mapping, created_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET mapping = excluded.mapping
            "#,
        )
        .bind(&spec.name)
        .bind(&mapping)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<UpsertOutcome, StorageError> {
        let spec = self
            .load_spec(index)
            .await?
            .ok_or_else(|| StorageError::UnknownIndex(index.to_string()))?;

        let existing = sqlx::query("SELECT doc, content_hash FROM documents WHERE idx = ? AND id = ?")
            .bind(index)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let (existing_doc, existing_hash) = match &existing {
            Some(row) => {
                let raw: String = row.get("doc");
                let hash: String = row.get("content_hash");
                (Some(serde_json::from_str::<Value>(&raw)?), Some(hash))
            }
            None => (None, None),
        };

        let mut merged = merge_document(existing_doc.as_ref(), doc);
        spec.normalize_document(&mut merged);
        let hash = content_hash(&merged)?;

        if existing_hash.as_deref() == Some(hash.as_str()) {
            return Ok(UpsertOutcome::Noop);
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO documents (idx, id, doc, content_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(idx, id) DO UPDATE SET
                doc = excluded.doc,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(index)
        .bind(id)
        .bind(serde_json::to_string(&merged)?)
        .bind(&hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if existing.is_some() {
            Ok(UpsertOutcome::Updated)
        } else {
            Ok(UpsertOutcome::Created)
        }
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT doc FROM documents WHERE idx = ? AND id = ?")
                .bind(index)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn query(&self, index: &str, filter: &Filter) -> Result<Vec<Value>, StorageError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT doc FROM documents WHERE idx = ? ORDER BY id ASC")
                .bind(index)
                .fetch_all(&self.pool)
                .await?;

        let mut documents = Vec::new();
        for raw in rows {
            let doc: Value = serde_json::from_str(&raw)?;
            if filter.matches(&doc) {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}
