//! Product catalog ingestion orchestration.
//!
//! Coordinates the full batch flow: CSV export → normalization → attribute
//! extraction → document assembly → upsert by SKU. One record's failure
//! (validation, storage rejection) is captured in the [`IngestReport`] and
//! never aborts the batch; only an unreadable input file is fatal, before
//! any record is processed. Re-running the same batch converges: documents
//! are keyed by SKU and unchanged merges count as noops.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;
use crate::extract::RuleSet;
use crate::models::{IngestReport, ProductDocument, RawRecord};
use crate::normalize;
use crate::sources::{self, ExportKind};
use crate::store::DocumentStore;

/// Options for one product ingestion run.
#[derive(Debug, Default)]
pub struct IngestOptions {
    /// Explicit input file; otherwise resolved from config.
    pub file: Option<PathBuf>,
    /// Target index override; otherwise `indices.products`.
    pub index: Option<String>,
    /// Maximum number of rows to process.
    pub limit: Option<usize>,
    /// Run the full pipeline but skip storage writes.
    pub dry_run: bool,
    /// Print the report as JSON instead of the text summary.
    pub json: bool,
}

/// Ingest a product catalog export.
pub async fn run_products(
    config: &Config,
    store: &dyn DocumentStore,
    opts: IngestOptions,
) -> Result<IngestReport> {
    let path = sources::resolve_export(config, ExportKind::Products, opts.file.as_deref())?;
    let index = opts
        .index
        .unwrap_or_else(|| config.indices.products.clone());
    let rules = RuleSet::new(&config.extraction)?;

    let report = ingest_catalog(store, &rules, &index, &path, opts.limit, opts.dry_run).await?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report("products", &path, &report, opts.dry_run);
    }
    Ok(report)
}

/// Core batch loop, separated from path/config resolution so tests and
/// embedders can drive it directly.
pub async fn ingest_catalog(
    store: &dyn DocumentStore,
    rules: &RuleSet,
    index: &str,
    path: &Path,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<IngestReport> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open catalog export: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {}", path.display()))?
        .clone();
    let mapped: Vec<Option<&'static str>> =
        headers.iter().map(normalize::map_header).collect();

    let mut report = IngestReport::default();

    for (i, row) in reader.records().enumerate() {
        if let Some(limit) = limit {
            if report.attempted as usize >= limit {
                break;
            }
        }
        report.attempted += 1;
        let row_number = (i + 1) as u64;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = row_number, error = %e, "unreadable CSV row");
                report.record_failure(format!("row {}", row_number), e.to_string());
                continue;
            }
        };

        let raw = to_raw_record(row_number, &mapped, &row);
        let record_id = raw.record_id();

        let record = match normalize::normalize(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!(record = %record_id, error = %e, "record failed validation");
                report.record_failure(record_id, e.to_string());
                continue;
            }
        };

        let attributes = rules.extract_record(&record);
        let document = ProductDocument::assemble(record, attributes);
        let sku = document.sku.clone();

        if dry_run {
            report.succeeded += 1;
            continue;
        }

        match store.upsert(index, &sku, &document.into_value()).await {
            Ok(outcome) => report.record_outcome(outcome),
            Err(e) => {
                warn!(record = %sku, error = %e, "storage rejected document");
                report.record_failure(sku, e.to_string());
            }
        }
    }

    Ok(report)
}

fn to_raw_record(
    row_number: u64,
    mapped: &[Option<&'static str>],
    row: &csv::StringRecord,
) -> RawRecord {
    let mut raw = RawRecord::new(row_number);
    for (idx, cell) in row.iter().enumerate() {
        if let Some(Some(field)) = mapped.get(idx) {
            if !cell.trim().is_empty() {
                raw.fields.insert(field.to_string(), cell.to_string());
            }
        }
    }
    raw
}

/// Print the run summary in the usual command-output shape.
pub fn print_report(label: &str, path: &Path, report: &IngestReport, dry_run: bool) {
    println!(
        "ingest {} {}{}",
        label,
        path.display(),
        if dry_run { " (dry-run)" } else { "" }
    );
    println!("  attempted: {}", report.attempted);
    println!(
        "  succeeded: {} (created={} updated={} noop={})",
        report.succeeded, report.created, report.updated, report.noop
    );
    println!("  failed:    {}", report.failed);
    for failure in &report.failures {
        println!("    {}: {}", failure.record_id, failure.reason);
    }
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::mappings::products_index;
    use crate::store::memory::MemoryStore;
    use std::io::Write;

    fn write_fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("products_test.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .ensure_index(&products_index("products"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_ingests_romanian_export() {
        let (_tmp, path) = write_fixture(
            "Cod Produs (SKU),Denumire Produs,Pret,Categorie principala\n\
             GP-10,Oja Gel Polish 15ml Rosu Rubin,\"25,90\",Gel Polish\n\
             GP-11,Top Coat Mat 8ml,19.00,Top Coat\n",
        );
        let store = store().await;
        let rules = RuleSet::new(&ExtractionConfig::default()).unwrap();

        let report = ingest_catalog(&store, &rules, "products", &path, None, false)
            .await
            .unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 0);

        let doc = store.get("products", "GP-10").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Oja Gel Polish 15ml Rosu Rubin");
        assert_eq!(doc["price"], 25.9);
        assert_eq!(doc["category_main"], "Gel Polish");
        assert_eq!(doc["attr_volume_ml"], 15.0);
        assert_eq!(doc["attr_shade_color"], "Rosu Rubin");
    }

    #[tokio::test]
    async fn test_missing_sku_is_partial_failure() {
        let (_tmp, path) = write_fixture(
            "sku,name\n\
             A-1,Produs unu\n\
             ,Produs fara sku\n\
             A-3,Produs trei\n",
        );
        let store = store().await;
        let rules = RuleSet::new(&ExtractionConfig::default()).unwrap();

        let report = ingest_catalog(&store, &rules, "products", &path, None, false)
            .await
            .unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].record_id, "row 2");
        assert!(report.failures[0].reason.contains("sku"));
    }

    #[tokio::test]
    async fn test_missing_file_is_top_level_error() {
        let store = store().await;
        let rules = RuleSet::new(&ExtractionConfig::default()).unwrap();
        let result = ingest_catalog(
            &store,
            &rules,
            "products",
            Path::new("/nonexistent/products.csv"),
            None,
            false,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (_tmp, path) = write_fixture("sku,name\nA-1,Produs unu\n");
        let store = store().await;
        let rules = RuleSet::new(&ExtractionConfig::default()).unwrap();

        let report = ingest_catalog(&store, &rules, "products", &path, None, true)
            .await
            .unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(store.get("products", "A-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_limit_bounds_rows() {
        let (_tmp, path) = write_fixture("sku,name\nA-1,Unu\nA-2,Doi\nA-3,Trei\n");
        let store = store().await;
        let rules = RuleSet::new(&ExtractionConfig::default()).unwrap();

        let report = ingest_catalog(&store, &rules, "products", &path, Some(2), false)
            .await
            .unwrap();
        assert_eq!(report.attempted, 2);
        assert!(store.get("products", "A-3").await.unwrap().is_none());
    }
}
