//! Data-quality reports over the indexed documents.
//!
//! `validate products` reports how complete the catalog is: missing
//! percentages for the critical merchandising fields and per-category
//! coverage of the derived attributes the dashboards rely on.
//! `validate incidents` surfaces incident rows that slipped in with
//! impossible quantities or missing critical fields.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::StorageError;
use crate::store::{DocumentStore, Filter};

/// Fields every sellable product should carry.
pub const REQUIRED_FIELDS: &[&str] = &["brand", "category_main", "price_final"];

/// Derived attributes audited for coverage.
pub const AUDIT_ATTRIBUTES: &[&str] = &[
    "attr_volume_ml",
    "attr_shade_code",
    "attr_finish",
    "attr_grit",
    "attr_liquid_type",
];

/// Incident fields that must always be present.
pub const CRITICAL_INCIDENT_FIELDS: &[&str] =
    &["supplier_id", "sku", "date_reported", "product_type"];

/// Attribute coverage within one category.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeCoverage {
    pub category_main: String,
    pub total_skus: u64,
    pub with_attribute: u64,
    pub coverage_ratio: f64,
}

/// Coverage of one attribute across categories, best-covered first.
pub async fn attribute_coverage_by_category(
    store: &dyn DocumentStore,
    index: &str,
    attribute: &str,
) -> Result<Vec<AttributeCoverage>, StorageError> {
    let docs = store.query(index, &Filter::MatchAll).await?;

    let mut per_category: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for doc in &docs {
        let category = doc
            .get("category_main")
            .and_then(Value::as_str)
            .unwrap_or("(uncategorized)");
        let entry = per_category.entry(category.to_string()).or_insert((0, 0));
        entry.0 += 1;
        if matches!(doc.get(attribute), Some(v) if !v.is_null()) {
            entry.1 += 1;
        }
    }

    let mut rows: Vec<AttributeCoverage> = per_category
        .into_iter()
        .map(|(category_main, (total_skus, with_attribute))| AttributeCoverage {
            category_main,
            total_skus,
            with_attribute,
            coverage_ratio: if total_skus == 0 {
                0.0
            } else {
                with_attribute as f64 / total_skus as f64
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.coverage_ratio
            .partial_cmp(&a.coverage_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category_main.cmp(&b.category_main))
    });
    Ok(rows)
}

/// `cata validate products`: completeness report for the catalog index.
pub async fn run_validate_products(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let index = &config.indices.products;
    let total = store.count(index, &Filter::MatchAll).await?;

    println!("=== Missing critical fields ===");
    println!("Total documents: {}", total);
    for field in REQUIRED_FIELDS {
        let missing = store.count(index, &Filter::missing(*field)).await?;
        let pct = if total == 0 {
            0.0
        } else {
            missing as f64 / total as f64 * 100.0
        };
        println!("- {}: {:.1}% missing", field, pct);
    }

    println!();
    println!("=== Derived attribute coverage by category ===");
    for attribute in AUDIT_ATTRIBUTES {
        let rows = attribute_coverage_by_category(store, index, attribute).await?;
        println!();
        println!("Attribute: {}", attribute);
        for row in rows.iter().take(5) {
            println!(
                "  {:<25} {:>5}/{:<5} ({:.1}%)",
                row.category_main,
                row.with_attribute,
                row.total_skus,
                row.coverage_ratio * 100.0
            );
        }
    }

    Ok(())
}

/// `cata validate incidents`: sanity checks for the incidents index.
pub async fn run_validate_incidents(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let index = &config.indices.supplier_incidents;
    let docs = store.query(index, &Filter::MatchAll).await?;

    println!("=== Supplier incident validation ===");

    let offenders: Vec<&Value> = docs
        .iter()
        .filter(|doc| {
            let total = doc
                .get("qty_total_in_shipment")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let damaged = doc.get("qty_damaged").and_then(Value::as_i64).unwrap_or(0);
            total > 0 && damaged > total
        })
        .collect();

    if offenders.is_empty() {
        println!();
        println!("No incident with qty_damaged above qty_total_in_shipment");
    } else {
        println!();
        println!(
            "Incidents with qty_damaged > qty_total_in_shipment ({} found):",
            offenders.len()
        );
        for doc in offenders.iter().take(10) {
            println!(
                "  {} / {}: damaged {} of {}",
                doc.get("supplier_id").and_then(Value::as_str).unwrap_or("?"),
                doc.get("sku").and_then(Value::as_str).unwrap_or("?"),
                doc.get("qty_damaged").and_then(Value::as_i64).unwrap_or(0),
                doc.get("qty_total_in_shipment")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
            );
        }
    }

    println!();
    println!("Missing critical fields:");
    let mut total_missing = 0u64;
    for field in CRITICAL_INCIDENT_FIELDS {
        let missing = docs
            .iter()
            .filter(|doc| !matches!(doc.get(*field), Some(v) if !v.is_null()))
            .count() as u64;
        total_missing += missing;
        println!("- {}: {} documents", field, missing);
    }
    if total_missing == 0 {
        println!("All critical fields are present");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::products_index;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_coverage_by_category() {
        let store = MemoryStore::new();
        store
            .ensure_index(&products_index("products"))
            .await
            .unwrap();
        for (sku, category, volume) in [
            ("A", "Gel Polish", Some(15.0)),
            ("B", "Gel Polish", None),
            ("C", "Accesorii", None),
        ] {
            let mut doc = json!({"sku": sku, "name": sku, "category_main": category});
            if let Some(volume) = volume {
                doc["attr_volume_ml"] = json!(volume);
            }
            store.upsert("products", sku, &doc).await.unwrap();
        }

        let rows = attribute_coverage_by_category(&store, "products", "attr_volume_ml")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category_main, "Gel Polish");
        assert_eq!(rows[0].total_skus, 2);
        assert_eq!(rows[0].with_attribute, 1);
        assert!((rows[0].coverage_ratio - 0.5).abs() < 1e-9);
        assert_eq!(rows[1].with_attribute, 0);
    }
}
