//! Daily SKU statistics aggregation.
//!
//! Aggregates order and return CSV exports into per-SKU-per-day documents
//! in the `sku_daily_stats` index, keyed `{sku}_{date}`. Orders contribute
//! `purchases` and `revenue`; returns contribute `returns`. Because upserts
//! merge fields, the two pipelines can run in either order and compose into
//! one document per SKU and day.
//!
//! Rows with an unparsable date or a blank SKU are dropped before
//! aggregation; unparsable quantities coerce to 0. A missing required
//! column aborts the run before anything is written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use tracing::warn;

use crate::config::Config;
use crate::ingest::print_report;
use crate::models::IngestReport;
use crate::sources::{self, ExportKind};
use crate::store::DocumentStore;

const ORDER_COLUMNS: &[&str] = &["order_date", "sku", "quantity", "line_total"];
const RETURN_COLUMNS: &[&str] = &["return_date", "sku", "quantity"];

/// Ingest an orders export: sum `quantity` and `line_total` per (sku, day).
pub async fn run_orders(
    config: &Config,
    store: &dyn DocumentStore,
    file: Option<PathBuf>,
    index: Option<String>,
) -> Result<IngestReport> {
    let path = sources::resolve_export(config, ExportKind::Orders, file.as_deref())?;
    let index = index.unwrap_or_else(|| config.indices.sku_daily_stats.clone());

    let rows = load_rows(&path, "order_date", ORDER_COLUMNS)?;
    let mut grouped: BTreeMap<(String, NaiveDate), (f64, f64)> = BTreeMap::new();
    for row in rows {
        let entry = grouped.entry((row.sku, row.date)).or_insert((0.0, 0.0));
        entry.0 += row.quantity;
        entry.1 += row.amount;
    }

    let docs: Vec<(String, serde_json::Value)> = grouped
        .into_iter()
        .map(|((sku, date), (purchases, revenue))| {
            (
                format!("{}_{}", sku, date),
                json!({
                    "sku": sku,
                    "date": date.to_string(),
                    "purchases": purchases as i64,
                    "revenue": revenue,
                }),
            )
        })
        .collect();

    let report = upsert_all(store, &index, &docs).await?;
    print_report("orders", &path, &report, false);
    Ok(report)
}

/// Ingest a returns export: sum returned `quantity` per (sku, day).
pub async fn run_returns(
    config: &Config,
    store: &dyn DocumentStore,
    file: Option<PathBuf>,
    index: Option<String>,
) -> Result<IngestReport> {
    let path = sources::resolve_export(config, ExportKind::Returns, file.as_deref())?;
    let index = index.unwrap_or_else(|| config.indices.sku_daily_stats.clone());

    let rows = load_rows(&path, "return_date", RETURN_COLUMNS)?;
    let mut grouped: BTreeMap<(String, NaiveDate), f64> = BTreeMap::new();
    for row in rows {
        *grouped.entry((row.sku, row.date)).or_insert(0.0) += row.quantity;
    }

    let docs: Vec<(String, serde_json::Value)> = grouped
        .into_iter()
        .map(|((sku, date), returns)| {
            (
                format!("{}_{}", sku, date),
                json!({
                    "sku": sku,
                    "date": date.to_string(),
                    "returns": returns as i64,
                }),
            )
        })
        .collect();

    let report = upsert_all(store, &index, &docs).await?;
    print_report("returns", &path, &report, false);
    Ok(report)
}

struct StatsRow {
    sku: String,
    date: NaiveDate,
    quantity: f64,
    /// line_total for orders, unused for returns.
    amount: f64,
}

fn load_rows(path: &Path, date_column: &str, required: &[&str]) -> Result<Vec<StatsRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open export: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {}", path.display()))?
        .clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| position(col).is_none())
        .collect();
    if !missing.is_empty() {
        bail!(
            "CSV is missing required columns: {} ({})",
            missing.join(", "),
            path.display()
        );
    }

    // Presence checked above.
    let date_idx = position(date_column).unwrap_or_default();
    let sku_idx = position("sku").unwrap_or_default();
    let qty_idx = position("quantity").unwrap_or_default();
    let amount_idx = position("line_total");

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = i + 1, error = %e, "dropping unreadable CSV row");
                continue;
            }
        };

        let sku = record.get(sku_idx).unwrap_or("").trim();
        let date = record.get(date_idx).and_then(|cell| parse_date(cell));
        let (sku, date) = match (sku, date) {
            (sku, Some(date)) if !sku.is_empty() => (sku.to_string(), date),
            _ => continue,
        };

        let quantity = record
            .get(qty_idx)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .unwrap_or(0.0);
        let amount = amount_idx
            .and_then(|idx| record.get(idx))
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        rows.push(StatsRow {
            sku,
            date,
            quantity,
            amount,
        });
    }

    Ok(rows)
}

/// Parse the date formats seen in platform exports.
fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(cell, "%d.%m.%Y"))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.date())
                .ok()
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(cell)
                .map(|dt| dt.date_naive())
                .ok()
        })
}

async fn upsert_all(
    store: &dyn DocumentStore,
    index: &str,
    docs: &[(String, serde_json::Value)],
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    report.attempted = docs.len() as u64;
    for (id, outcome) in store.bulk_upsert(index, docs).await? {
        match outcome {
            Ok(outcome) => report.record_outcome(outcome),
            Err(e) => report.record_failure(id, e.to_string()),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::sku_daily_stats_index;
    use crate::store::memory::MemoryStore;
    use crate::store::Filter;

    fn config(dir: &Path) -> Config {
        Config {
            storage: crate::config::StorageConfig {
                path: dir.join("catalog.sqlite"),
            },
            indices: Default::default(),
            data: crate::config::DataConfig {
                dir: dir.to_path_buf(),
                ..Default::default()
            },
            extraction: Default::default(),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .ensure_index(&sku_daily_stats_index("sku_daily_stats"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_orders_aggregate_by_sku_and_day() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("orders_x.csv");
        std::fs::write(
            &path,
            "order_date,sku,quantity,line_total\n\
             2024-06-01,A-1,2,20.0\n\
             2024-06-01,A-1,1,10.0\n\
             2024-06-02,A-1,1,10.0\n\
             2024-06-01,B-2,bad,5.0\n\
             not-a-date,C-3,1,1.0\n",
        )
        .unwrap();

        let store = store().await;
        let report = run_orders(&config(tmp.path()), &store, Some(path), None)
            .await
            .unwrap();
        // three aggregated documents; the bad-date row was dropped
        assert_eq!(report.attempted, 3);
        assert_eq!(report.created, 3);

        let doc = store
            .get("sku_daily_stats", "A-1_2024-06-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["purchases"], 3);
        assert_eq!(doc["revenue"], 30.0);

        // unparsable quantity coerces to zero
        let doc = store
            .get("sku_daily_stats", "B-2_2024-06-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["purchases"], 0);
    }

    #[tokio::test]
    async fn test_returns_merge_into_order_docs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let orders = tmp.path().join("orders_x.csv");
        let returns = tmp.path().join("returns_x.csv");
        std::fs::write(
            &orders,
            "order_date,sku,quantity,line_total\n2024-06-01,A-1,2,20.0\n",
        )
        .unwrap();
        std::fs::write(&returns, "return_date,sku,quantity\n2024-06-01,A-1,1\n").unwrap();

        let store = store().await;
        let cfg = config(tmp.path());
        run_orders(&cfg, &store, Some(orders), None).await.unwrap();
        run_returns(&cfg, &store, Some(returns), None)
            .await
            .unwrap();

        let doc = store
            .get("sku_daily_stats", "A-1_2024-06-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["purchases"], 2);
        assert_eq!(doc["revenue"], 20.0);
        assert_eq!(doc["returns"], 1);

        let total = store
            .count("sku_daily_stats", &Filter::term("sku", "A-1"))
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_missing_required_column_aborts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("orders_x.csv");
        std::fs::write(&path, "sku,quantity\nA-1,2\n").unwrap();

        let store = store().await;
        let result = run_orders(&config(tmp.path()), &store, Some(path), None).await;
        assert!(result.is_err());
    }
}
