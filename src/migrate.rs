use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::mappings;
use crate::store::sqlite::SqliteStore;
use crate::store::DocumentStore;

/// Register every mapping-defined index on the store. Idempotent: existing
/// indices get their mapping refreshed.
pub async fn ensure_all_indices(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    for spec in mappings::all_indices(&config.indices) {
        info!(index = %spec.name, fields = spec.properties.len(), "ensuring index mapping");
        store.ensure_index(&spec).await?;
    }
    Ok(())
}

/// `cata init`: create the database file, schema, and index mappings.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    ensure_all_indices(config, &store).await?;
    store.close().await;
    Ok(())
}
