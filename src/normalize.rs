//! Record normalization.
//!
//! Translates the Romanian export headers to internal field names, trims
//! and type-coerces cell values, and validates that the mandatory fields
//! (SKU, name) are present. Coercion is forgiving: an unparsable price or
//! flag makes that one field absent, it never fails the record. All text
//! passes through untouched UTF-8, so diacritics survive end-to-end.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{NormalizedRecord, RawRecord};

/// Romanian export column label → internal field name, in export order.
pub const RO_COLUMN_MAP: &[(&str, &str)] = &[
    ("Cod Produs (SKU)", "sku"),
    ("Denumire Produs", "name"),
    ("Cod Grupa", "group_code"),
    ("Activ in Magazin", "active"),
    ("Stare Stoc", "stock_status"),
    ("Marca (Brand)", "brand"),
    ("Descriere Produs", "description_html"),
    ("Descriere Scurta a Produsului", "description_short"),
    ("Descriere pt feed-uri", "description_feed"),
    ("Pret", "price"),
    ("Pret intreg (Calculat)", "price_list"),
    ("Pret final (Calculat)", "price_final"),
    ("Pretul Include TVA", "vat_included"),
    ("Cota TVA", "vat_rate"),
    ("URL Poza de Produs", "image_url"),
    ("Imagine principala", "image_main"),
    ("Imagine secundara 1", "image_secondary_1"),
    ("Imagine secundara 2", "image_secondary_2"),
    ("Categorie / Categorii", "category_path"),
    ("Categorie principala", "category_main"),
    ("Subcategorie de nivel 1", "subcategory_level1"),
    ("Subcategorie de nivel 2", "subcategory_level2"),
    ("Titlu Meta", "meta_title"),
    ("Descriere Meta", "meta_description"),
    ("Cuvinte Cheie", "keywords"),
    ("Produse Cross-Sell", "cross_sell_skus"),
    ("Produse Up-Sell", "up_sell_skus"),
    ("Atribute: Ingrediente (editor text)", "ingredients_html"),
];

const NUMERIC_FIELDS: &[&str] = &["price", "price_list", "price_final", "vat_rate"];
const LIST_FIELDS: &[&str] = &["cross_sell_skus", "up_sell_skus"];

/// Map an export header to its internal field name.
///
/// Accepts both the Romanian export labels and already-internal names, so
/// re-exports of previously normalized data round-trip. Unknown headers map
/// to `None` and their columns are dropped.
pub fn map_header(header: &str) -> Option<&'static str> {
    let cleaned = header.trim_start_matches('\u{feff}').trim();
    for (ro, internal) in RO_COLUMN_MAP {
        if *ro == cleaned || *internal == cleaned {
            return Some(internal);
        }
    }
    None
}

/// Normalize one raw row into a typed record.
///
/// Fails only when `sku` or `name` is absent or blank; everything else
/// degrades to absent fields.
pub fn normalize(raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
    let mut fields: BTreeMap<String, Value> = BTreeMap::new();

    for (field, raw_value) in &raw.fields {
        let trimmed = raw_value.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value = if NUMERIC_FIELDS.contains(&field.as_str()) {
            safe_float(trimmed).and_then(number)
        } else if field == "vat_included" {
            safe_bool(trimmed).map(Value::Bool)
        } else if LIST_FIELDS.contains(&field.as_str()) {
            split_list(trimmed)
        } else {
            Some(Value::String(trimmed.to_string()))
        };

        if let Some(value) = value {
            fields.insert(field.clone(), value);
        }
    }

    let sku = mandatory(&fields, "sku")?;
    let name = mandatory(&fields, "name")?;

    Ok(NormalizedRecord { sku, name, fields })
}

fn mandatory(
    fields: &BTreeMap<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField { field })
}

/// Parse a numeric string, tolerating the comma decimal separator used by
/// the export ("12,50" → 12.5). Returns `None` on anything unparsable.
fn safe_float(value: &str) -> Option<f64> {
    value.replace(',', ".").parse::<f64>().ok()
}

fn number(value: f64) -> Option<Value> {
    serde_json::Number::from_f64(value).map(Value::Number)
}

/// Parse the da/nu flags of the export, plus the usual yes/no spellings.
fn safe_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "da" | "yes" | "true" | "1" => Some(true),
        "nu" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> Option<Value> {
    let parts: Vec<Value> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(Value::Array(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        let mut record = RawRecord::new(1);
        for (k, v) in pairs {
            record.fields.insert(k.to_string(), v.to_string());
        }
        record
    }

    #[test]
    fn test_maps_romanian_headers() {
        assert_eq!(map_header("Cod Produs (SKU)"), Some("sku"));
        assert_eq!(map_header("Denumire Produs"), Some("name"));
        assert_eq!(map_header("\u{feff}Cod Produs (SKU)"), Some("sku"));
        assert_eq!(map_header("sku"), Some("sku"));
        assert_eq!(map_header("Coloana Necunoscuta"), None);
    }

    #[test]
    fn test_normalizes_values() {
        let record = raw(&[
            ("sku", "SKU123"),
            ("name", "Gel Polish 10 ml"),
            ("price", "12,50"),
            ("price_final", "10.00"),
            ("vat_included", "Da"),
            ("keywords", "gel, polish"),
            ("cross_sell_skus", "SKU200, SKU201"),
            ("up_sell_skus", "SKU300"),
            ("description_html", "Finisaj mat"),
        ]);

        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.sku, "SKU123");
        assert_eq!(normalized.name, "Gel Polish 10 ml");
        assert_eq!(normalized.fields["price"], json!(12.5));
        assert_eq!(normalized.fields["price_final"], json!(10.0));
        assert_eq!(normalized.fields["vat_included"], json!(true));
        assert_eq!(
            normalized.fields["cross_sell_skus"],
            json!(["SKU200", "SKU201"])
        );
        assert_eq!(normalized.fields["up_sell_skus"], json!(["SKU300"]));
        // keywords is a plain text field, not a list field
        assert_eq!(normalized.fields["keywords"], json!("gel, polish"));
    }

    #[test]
    fn test_unparsable_numeric_becomes_absent() {
        let record = raw(&[("sku", "A"), ("name", "B"), ("price", "n/a")]);
        let normalized = normalize(&record).unwrap();
        assert!(!normalized.fields.contains_key("price"));
    }

    #[test]
    fn test_missing_sku_fails() {
        let record = raw(&[("name", "Oja")]);
        let err = normalize(&record).unwrap_err();
        assert!(err.to_string().contains("sku"));
    }

    #[test]
    fn test_blank_name_fails() {
        let record = raw(&[("sku", "A"), ("name", "   ")]);
        assert!(normalize(&record).is_err());
    }

    #[test]
    fn test_present_sku_and_name_never_fail() {
        let record = raw(&[("sku", "X"), ("name", "Y"), ("vat_included", "poate")]);
        let normalized = normalize(&record).unwrap();
        assert!(!normalized.fields.contains_key("vat_included"));
    }

    #[test]
    fn test_diacritics_preserved() {
        let record = raw(&[
            ("sku", "RO-1"),
            ("name", "Oja semipermanentă Căpșuni"),
            ("description_html", "Miros de lavandă și trandafir"),
        ]);
        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.name, "Oja semipermanentă Căpșuni");
        assert_eq!(
            normalized.description(),
            Some("Miros de lavandă și trandafir")
        );
    }
}
