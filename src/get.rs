//! Product retrieval by SKU.
//!
//! Fetches a product document from the catalog index. Used by the
//! `cata get` CLI command and exposed for embedding; the same documents are
//! what the external REST/dashboard layer reads.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::config::Config;
use crate::error::StorageError;
use crate::store::DocumentStore;

/// Fetch one product document by SKU.
pub async fn fetch_product(
    store: &dyn DocumentStore,
    index: &str,
    sku: &str,
) -> Result<Option<Value>, StorageError> {
    store.get(index, sku).await
}

/// CLI entry point: print the document, either as aligned fields or JSON.
pub async fn run_get(
    config: &Config,
    store: &dyn DocumentStore,
    sku: &str,
    as_json: bool,
) -> Result<()> {
    let doc = match fetch_product(store, &config.indices.products, sku).await? {
        Some(doc) => doc,
        None => bail!("product not found: {}", sku),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("--- Product {} ---", sku);
    if let Some(fields) = doc.as_object() {
        for (field, value) in fields {
            match value {
                Value::String(text) => println!("{:<24} {}", field, text),
                other => println!("{:<24} {}", field, other),
            }
        }
    }

    Ok(())
}
