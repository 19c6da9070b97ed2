//! Supplier incident logging and analytics.
//!
//! Incidents record damaged goods discovered in supplier shipments. They
//! are upserted by `incident_id` (generated when the export omits one) and
//! queried back for the damage-rate reports: per supplier, per supplier and
//! product type, damage-type distribution, and a monthly series for one
//! supplier. All rates are `qty_damaged / qty_total_in_shipment` with a
//! zero-total guard.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{StorageError, ValidationError};
use crate::ingest::print_report;
use crate::models::{IngestReport, SupplierIncident};
use crate::sources::{self, ExportKind};
use crate::store::{DocumentStore, Filter, UpsertOutcome};

/// Insert or update a single incident.
pub async fn insert_incident(
    store: &dyn DocumentStore,
    index: &str,
    incident: &SupplierIncident,
) -> Result<UpsertOutcome, StorageError> {
    let doc = serde_json::to_value(incident)?;
    store.upsert(index, &incident.incident_id, &doc).await
}

/// Bulk-insert incidents with per-record outcomes.
pub async fn bulk_insert_incidents(
    store: &dyn DocumentStore,
    index: &str,
    incidents: &[SupplierIncident],
) -> Result<IngestReport, StorageError> {
    let mut docs = Vec::with_capacity(incidents.len());
    for incident in incidents {
        docs.push((incident.incident_id.clone(), serde_json::to_value(incident)?));
    }

    let mut report = IngestReport::default();
    report.attempted = docs.len() as u64;
    for (id, outcome) in store.bulk_upsert(index, &docs).await? {
        match outcome {
            Ok(outcome) => report.record_outcome(outcome),
            Err(e) => report.record_failure(id, e.to_string()),
        }
    }
    Ok(report)
}

/// Ingest an incidents CSV export.
///
/// Expected columns: `supplier_id`, `supplier_name`, `date_reported`,
/// `sku`, `product_type`, `category_main`, `qty_total_in_shipment`,
/// `qty_damaged`, plus the optional metadata columns. `incident_id` is
/// generated when blank. Rows missing a mandatory field fail individually;
/// the batch continues.
pub async fn run_incidents_ingest(
    config: &Config,
    store: &dyn DocumentStore,
    file: Option<PathBuf>,
    index: Option<String>,
) -> Result<IngestReport> {
    let path = sources::resolve_export(config, ExportKind::Incidents, file.as_deref())?;
    let index = index.unwrap_or_else(|| config.indices.supplier_incidents.clone());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open incidents export: {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {}", path.display()))?
        .clone();

    let mut report = IngestReport::default();

    for (i, record) in reader.records().enumerate() {
        report.attempted += 1;
        let row_number = i + 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.record_failure(format!("row {}", row_number), e.to_string());
                continue;
            }
        };

        let incident = match incident_from_row(&headers, &record) {
            Ok(incident) => incident,
            Err(e) => {
                debug!(row = row_number, error = %e, "incident row failed validation");
                report.record_failure(format!("row {}", row_number), e.to_string());
                continue;
            }
        };

        match insert_incident(store, &index, &incident).await {
            Ok(outcome) => report.record_outcome(outcome),
            Err(e) => report.record_failure(incident.incident_id.clone(), e.to_string()),
        }
    }

    print_report("incidents", &path, &report, false);
    Ok(report)
}

fn incident_from_row(
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
) -> Result<SupplierIncident, ValidationError> {
    let cell = |name: &str| -> Option<String> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let mandatory = |name: &'static str| -> Result<String, ValidationError> {
        cell(name).ok_or(ValidationError::MissingField { field: name })
    };
    let quantity = |name: &'static str| -> Result<i64, ValidationError> {
        let raw = mandatory(name)?;
        raw.parse::<i64>()
            .map_err(|_| ValidationError::MalformedRow(format!("{} is not an integer: {}", name, raw)))
    };

    let date_reported = {
        let raw = mandatory("date_reported")?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ValidationError::MalformedRow(format!("date_reported is not a date: {}", raw))
        })?
    };

    Ok(SupplierIncident {
        incident_id: cell("incident_id").unwrap_or_else(|| Uuid::new_v4().to_string()),
        supplier_id: mandatory("supplier_id")?,
        supplier_name: cell("supplier_name").unwrap_or_default(),
        date_reported,
        sku: mandatory("sku")?,
        product_type: mandatory("product_type")?,
        category_main: cell("category_main").unwrap_or_default(),
        qty_total_in_shipment: quantity("qty_total_in_shipment")?,
        qty_damaged: quantity("qty_damaged")?,
        damage_type: cell("damage_type")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        shipment_id: cell("shipment_id"),
        transport_company: cell("transport_company"),
        root_cause_guess: cell("root_cause_guess"),
        batch_id: cell("batch_id"),
        packaging_primary: cell("packaging_primary"),
        packaging_secondary: cell("packaging_secondary"),
        packaging_cushioning: cell("packaging_cushioning"),
        comment: cell("comment"),
        created_at: Utc::now(),
    })
}

/// Damage rate aggregated over one supplier.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierDamageRate {
    pub supplier_id: String,
    pub damage_rate: f64,
    pub qty_total: i64,
    pub qty_damaged: i64,
}

/// Damage rate per supplier, optionally restricted to one product type.
pub async fn damage_rate_per_supplier(
    store: &dyn DocumentStore,
    index: &str,
    product_type: Option<&str>,
) -> Result<Vec<SupplierDamageRate>, StorageError> {
    let filter = match product_type {
        Some(value) => Filter::term("product_type", value),
        None => Filter::MatchAll,
    };
    let docs = store.query(index, &filter).await?;

    let mut totals: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for doc in &docs {
        let Some(supplier) = doc.get("supplier_id").and_then(Value::as_str) else {
            continue;
        };
        let entry = totals.entry(supplier.to_string()).or_insert((0, 0));
        entry.0 += int_field(doc, "qty_total_in_shipment");
        entry.1 += int_field(doc, "qty_damaged");
    }

    Ok(totals
        .into_iter()
        .map(|(supplier_id, (qty_total, qty_damaged))| SupplierDamageRate {
            supplier_id,
            damage_rate: rate(qty_damaged, qty_total),
            qty_total,
            qty_damaged,
        })
        .collect())
}

/// Damage rate per (supplier, product type) pair.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierTypeDamageRate {
    pub supplier_id: String,
    pub product_type: String,
    pub damage_rate: f64,
    pub qty_total: i64,
    pub qty_damaged: i64,
}

pub async fn damage_rate_per_supplier_and_type(
    store: &dyn DocumentStore,
    index: &str,
) -> Result<Vec<SupplierTypeDamageRate>, StorageError> {
    let docs = store.query(index, &Filter::MatchAll).await?;

    let mut totals: BTreeMap<(String, String), (i64, i64)> = BTreeMap::new();
    for doc in &docs {
        let (Some(supplier), Some(product_type)) = (
            doc.get("supplier_id").and_then(Value::as_str),
            doc.get("product_type").and_then(Value::as_str),
        ) else {
            continue;
        };
        let entry = totals
            .entry((supplier.to_string(), product_type.to_string()))
            .or_insert((0, 0));
        entry.0 += int_field(doc, "qty_total_in_shipment");
        entry.1 += int_field(doc, "qty_damaged");
    }

    Ok(totals
        .into_iter()
        .map(
            |((supplier_id, product_type), (qty_total, qty_damaged))| SupplierTypeDamageRate {
                supplier_id,
                product_type,
                damage_rate: rate(qty_damaged, qty_total),
                qty_total,
                qty_damaged,
            },
        )
        .collect())
}

/// Count of one damage type for one supplier.
#[derive(Debug, Clone, Serialize)]
pub struct DamageTypeCount {
    pub damage_type: String,
    pub count: u64,
}

/// Per-supplier distribution of damage types.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierDamageTypes {
    pub supplier_id: String,
    pub damage_types: Vec<DamageTypeCount>,
}

pub async fn damage_types_distribution_per_supplier(
    store: &dyn DocumentStore,
    index: &str,
) -> Result<Vec<SupplierDamageTypes>, StorageError> {
    let docs = store.query(index, &Filter::MatchAll).await?;

    let mut distribution: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for doc in &docs {
        let Some(supplier) = doc.get("supplier_id").and_then(Value::as_str) else {
            continue;
        };
        let types = distribution.entry(supplier.to_string()).or_default();
        if let Some(damage_types) = doc.get("damage_type").and_then(Value::as_array) {
            for damage_type in damage_types.iter().filter_map(Value::as_str) {
                *types.entry(damage_type.to_string()).or_insert(0) += 1;
            }
        }
    }

    Ok(distribution
        .into_iter()
        .map(|(supplier_id, types)| SupplierDamageTypes {
            supplier_id,
            damage_types: types
                .into_iter()
                .map(|(damage_type, count)| DamageTypeCount { damage_type, count })
                .collect(),
        })
        .collect())
}

/// Damage rate for one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyDamageRate {
    /// Calendar month in `YYYY-MM` form.
    pub month: String,
    pub damage_rate: f64,
    pub qty_total: i64,
    pub qty_damaged: i64,
}

pub async fn monthly_damage_rate_for_supplier(
    store: &dyn DocumentStore,
    index: &str,
    supplier_id: &str,
) -> Result<Vec<MonthlyDamageRate>, StorageError> {
    let docs = store
        .query(index, &Filter::term("supplier_id", supplier_id))
        .await?;

    let mut monthly: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for doc in &docs {
        let Some(month) = doc
            .get("date_reported")
            .and_then(Value::as_str)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .map(|date| date.format("%Y-%m").to_string())
        else {
            continue;
        };
        let entry = monthly.entry(month).or_insert((0, 0));
        entry.0 += int_field(doc, "qty_total_in_shipment");
        entry.1 += int_field(doc, "qty_damaged");
    }

    Ok(monthly
        .into_iter()
        .map(|(month, (qty_total, qty_damaged))| MonthlyDamageRate {
            month,
            damage_rate: rate(qty_damaged, qty_total),
            qty_total,
            qty_damaged,
        })
        .collect())
}

/// `cata report damage-rate`: print the per-supplier damage table.
pub async fn run_damage_rate_report(
    config: &Config,
    store: &dyn DocumentStore,
    product_type: Option<&str>,
) -> Result<()> {
    let index = &config.indices.supplier_incidents;
    let rates = damage_rate_per_supplier(store, index, product_type).await?;

    match product_type {
        Some(product_type) => println!("Damage rate per supplier (product type: {})", product_type),
        None => println!("Damage rate per supplier"),
    }
    println!(
        "{:<16} {:>10} {:>10} {:>10}",
        "SUPPLIER", "TOTAL", "DAMAGED", "RATE"
    );
    for row in &rates {
        println!(
            "{:<16} {:>10} {:>10} {:>9.1}%",
            row.supplier_id,
            row.qty_total,
            row.qty_damaged,
            row.damage_rate * 100.0
        );
    }
    Ok(())
}

/// `cata report damage-rate-by-type`: per supplier and product type.
pub async fn run_damage_rate_by_type_report(
    config: &Config,
    store: &dyn DocumentStore,
) -> Result<()> {
    let index = &config.indices.supplier_incidents;
    let rates = damage_rate_per_supplier_and_type(store, index).await?;

    println!("Damage rate per supplier and product type");
    println!(
        "{:<16} {:<16} {:>10} {:>10} {:>10}",
        "SUPPLIER", "TYPE", "TOTAL", "DAMAGED", "RATE"
    );
    for row in &rates {
        println!(
            "{:<16} {:<16} {:>10} {:>10} {:>9.1}%",
            row.supplier_id,
            row.product_type,
            row.qty_total,
            row.qty_damaged,
            row.damage_rate * 100.0
        );
    }
    Ok(())
}

/// `cata report damage-types`: damage-type distribution per supplier.
pub async fn run_damage_types_report(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let index = &config.indices.supplier_incidents;
    let distribution = damage_types_distribution_per_supplier(store, index).await?;

    println!("Damage types per supplier");
    for supplier in &distribution {
        println!("{}", supplier.supplier_id);
        for entry in &supplier.damage_types {
            println!("  {:<20} {}", entry.damage_type, entry.count);
        }
    }
    Ok(())
}

/// `cata report monthly --supplier <id>`: monthly damage-rate series.
pub async fn run_monthly_report(
    config: &Config,
    store: &dyn DocumentStore,
    supplier_id: &str,
) -> Result<()> {
    let index = &config.indices.supplier_incidents;
    let series = monthly_damage_rate_for_supplier(store, index, supplier_id).await?;

    println!("Monthly damage rate for supplier {}", supplier_id);
    println!("{:<10} {:>10} {:>10} {:>10}", "MONTH", "TOTAL", "DAMAGED", "RATE");
    for row in &series {
        println!(
            "{:<10} {:>10} {:>10} {:>9.1}%",
            row.month,
            row.qty_total,
            row.qty_damaged,
            row.damage_rate * 100.0
        );
    }
    Ok(())
}

fn int_field(doc: &Value, field: &str) -> i64 {
    doc.get(field)
        .and_then(Value::as_i64)
        .or_else(|| doc.get(field).and_then(Value::as_f64).map(|v| v as i64))
        .unwrap_or(0)
}

fn rate(damaged: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        damaged as f64 / total as f64
    }
}
