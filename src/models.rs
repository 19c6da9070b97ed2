//! Core data models used throughout Catalog Harness.
//!
//! These types represent the records, documents, and run reports that flow
//! through the normalization, extraction, and ingestion pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::UpsertOutcome;

/// Raw catalog row as read from an export file, before normalization.
///
/// Header names are already translated to internal field names; values are
/// untrimmed strings exactly as they appeared in the file. Blank cells are
/// not present in the map.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based data row number within the export (header excluded).
    pub row: u64,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(row: u64) -> Self {
        Self {
            row,
            fields: BTreeMap::new(),
        }
    }

    /// Identifier used in failure reports: the SKU when present, otherwise
    /// the row number.
    pub fn record_id(&self) -> String {
        match self.fields.get("sku").map(|s| s.trim()) {
            Some(sku) if !sku.is_empty() => sku.to_string(),
            _ => format!("row {}", self.row),
        }
    }
}

/// Record with mandatory fields validated and values coerced to their
/// target types. Produced by [`normalize`](crate::normalize).
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub sku: String,
    pub name: String,
    /// All retained fields (including `sku` and `name`) with typed values:
    /// strings, numbers, booleans, or string lists.
    pub fields: BTreeMap<String, Value>,
}

impl NormalizedRecord {
    /// The description text used for attribute extraction. Prefers the full
    /// HTML description and falls back to the short one.
    pub fn description(&self) -> Option<&str> {
        self.fields
            .get("description_html")
            .or_else(|| self.fields.get("description_short"))
            .and_then(Value::as_str)
    }
}

/// Derived `attr_*` fields keyed by attribute name. A `BTreeMap` keeps
/// iteration (and serialization) order deterministic.
pub type AttributeMap = BTreeMap<String, Value>;

/// Assembled product document: normalized fields merged with derived
/// attributes, identified by SKU.
#[derive(Debug, Clone)]
pub struct ProductDocument {
    pub sku: String,
    pub fields: BTreeMap<String, Value>,
}

impl ProductDocument {
    pub fn assemble(record: NormalizedRecord, attributes: AttributeMap) -> Self {
        let mut fields = record.fields;
        fields.extend(attributes);
        Self {
            sku: record.sku,
            fields,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields.into_iter().collect())
    }
}

/// A single record that failed during an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub record_id: String,
    pub reason: String,
}

/// Aggregate outcome of one ingestion run.
///
/// `succeeded` counts every record that reached storage, including noops;
/// the created/updated/noop breakdown mirrors the bulk-update result labels
/// of the storage backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub created: u64,
    pub updated: u64,
    pub noop: u64,
    pub failures: Vec<RecordFailure>,
}

impl IngestReport {
    pub fn record_outcome(&mut self, outcome: UpsertOutcome) {
        self.succeeded += 1;
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Noop => self.noop += 1,
        }
    }

    pub fn record_failure(&mut self, record_id: String, reason: String) {
        self.failed += 1;
        self.failures.push(RecordFailure { record_id, reason });
    }
}

/// A supplier damage incident, keyed by `incident_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierIncident {
    pub incident_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub date_reported: NaiveDate,
    pub sku: String,
    pub product_type: String,
    pub category_main: String,
    pub qty_total_in_shipment: i64,
    pub qty_damaged: i64,
    #[serde(default)]
    pub damage_type: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause_guess: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_cushioning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
