//! Database statistics and health overview.
//!
//! Provides a quick summary of what's indexed: per-index document counts
//! and the database size. Used by `cata stats` to give confidence that
//! ingestion runs are landing where expected.

use anyhow::Result;

use crate::config::Config;
use crate::store::sqlite::SqliteStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let counts = store.index_counts().await?;
    let db_size = SqliteStore::db_size(config);

    println!("Catalog Harness — Database Stats");
    println!("================================");
    println!();
    println!("  Database:    {}", config.storage.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    if counts.is_empty() {
        println!("  No indices found. Run `cata init` first.");
    } else {
        println!("  {:<28} {:>8}", "INDEX", "DOCS");
        println!("  {}", "-".repeat(38));
        for (name, doc_count) in &counts {
            println!("  {:<28} {:>8}", name, doc_count);
        }
    }

    println!();
    store.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
