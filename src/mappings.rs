//! Index mappings for the catalog analytics store.
//!
//! Each index the pipeline writes to is mapping-defined: an [`IndexSpec`]
//! names the index and declares its field types. Scaled-float fields carry
//! the scaling factor the store applies on write, which is the only
//! storage-imposed normalization a round-trip can observe.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::IndicesConfig;

/// Field type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Keyword,
    Text,
    Float,
    ScaledFloat { scaling_factor: f64 },
    Integer,
    Boolean,
    Date,
}

/// A mapping-defined index: name plus typed properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub properties: BTreeMap<String, FieldType>,
}

impl IndexSpec {
    /// Apply storage-imposed numeric normalization: scaled-float fields are
    /// rounded to their scaling factor. Other fields pass through.
    pub fn normalize_document(&self, doc: &mut Value) {
        let Some(object) = doc.as_object_mut() else {
            return;
        };
        for (field, field_type) in &self.properties {
            if let FieldType::ScaledFloat { scaling_factor } = field_type {
                if let Some(number) = object.get(field).and_then(Value::as_f64) {
                    let scaled = (number * scaling_factor).round() / scaling_factor;
                    if let Some(rounded) = serde_json::Number::from_f64(scaled) {
                        object.insert(field.clone(), Value::Number(rounded));
                    }
                }
            }
        }
    }
}

fn spec(name: &str, properties: &[(&str, FieldType)]) -> IndexSpec {
    IndexSpec {
        name: name.to_string(),
        properties: properties
            .iter()
            .map(|(field, field_type)| (field.to_string(), *field_type))
            .collect(),
    }
}

/// Product catalog index: normalized export fields plus derived attributes.
pub fn products_index(name: &str) -> IndexSpec {
    use FieldType::*;
    spec(
        name,
        &[
            ("sku", Keyword),
            ("name", Text),
            ("group_code", Keyword),
            ("active", Keyword),
            ("stock_status", Keyword),
            ("brand", Keyword),
            ("description_html", Text),
            ("description_short", Text),
            ("description_feed", Text),
            ("price", ScaledFloat { scaling_factor: 100.0 }),
            ("price_list", ScaledFloat { scaling_factor: 100.0 }),
            ("price_final", ScaledFloat { scaling_factor: 100.0 }),
            ("vat_included", Boolean),
            ("vat_rate", ScaledFloat { scaling_factor: 10.0 }),
            ("image_url", Keyword),
            ("image_main", Keyword),
            ("image_secondary_1", Keyword),
            ("image_secondary_2", Keyword),
            ("category_path", Keyword),
            ("category_main", Keyword),
            ("subcategory_level1", Keyword),
            ("subcategory_level2", Keyword),
            ("meta_title", Text),
            ("meta_description", Text),
            ("keywords", Keyword),
            ("cross_sell_skus", Keyword),
            ("up_sell_skus", Keyword),
            ("ingredients_html", Text),
            ("total_revenue", ScaledFloat { scaling_factor: 100.0 }),
            ("attr_volume_ml", Float),
            ("attr_color_name", Keyword),
            ("attr_shade_code", Keyword),
            ("attr_shade_color", Keyword),
            ("attr_finish", Keyword),
            ("attr_curing_type", Keyword),
            ("attr_collection", Keyword),
            ("attr_liquid_type", Keyword),
            ("attr_scent", Keyword),
            ("attr_strength_percent", Float),
            ("attr_length_mm", Float),
            ("attr_material", Keyword),
            ("attr_grit", Keyword),
            ("attr_shape", Keyword),
            ("updated_at", Date),
        ],
    )
}

/// Per-SKU-per-day sales and returns counters.
pub fn sku_daily_stats_index(name: &str) -> IndexSpec {
    use FieldType::*;
    spec(
        name,
        &[
            ("sku", Keyword),
            ("date", Date),
            ("views", Integer),
            ("add_to_cart", Integer),
            ("purchases", Integer),
            ("returns", Integer),
            ("revenue", ScaledFloat { scaling_factor: 100.0 }),
        ],
    )
}

/// Supplier damage incidents.
pub fn supplier_incidents_index(name: &str) -> IndexSpec {
    use FieldType::*;
    spec(
        name,
        &[
            ("incident_id", Keyword),
            ("supplier_id", Keyword),
            ("supplier_name", Keyword),
            ("date_reported", Date),
            ("shipment_id", Keyword),
            ("transport_company", Keyword),
            ("sku", Keyword),
            ("product_type", Keyword),
            ("category_main", Keyword),
            ("qty_total_in_shipment", Integer),
            ("qty_damaged", Integer),
            ("damage_type", Keyword),
            ("root_cause_guess", Keyword),
            ("batch_id", Keyword),
            ("packaging_primary", Keyword),
            ("packaging_secondary", Keyword),
            ("packaging_cushioning", Keyword),
            ("comment", Text),
            ("created_at", Date),
        ],
    )
}

/// All indices the pipeline needs, with names taken from the config.
pub fn all_indices(indices: &IndicesConfig) -> Vec<IndexSpec> {
    vec![
        products_index(&indices.products),
        sku_daily_stats_index(&indices.sku_daily_stats),
        supplier_incidents_index(&indices.supplier_incidents),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scaled_float_rounding() {
        let spec = products_index("products");
        let mut doc = json!({"sku": "A", "price": 12.346, "vat_rate": 19.04, "attr_volume_ml": 15.123});
        spec.normalize_document(&mut doc);
        assert_eq!(doc["price"], json!(12.35));
        assert_eq!(doc["vat_rate"], json!(19.0));
        // plain floats are not rounded
        assert_eq!(doc["attr_volume_ml"], json!(15.123));
    }

    #[test]
    fn test_mapping_round_trips_as_json() {
        let spec = supplier_incidents_index("supplier_incidents");
        let encoded = serde_json::to_string(&spec).unwrap();
        let decoded: IndexSpec = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.name, "supplier_incidents");
        assert_eq!(
            decoded.properties.get("qty_damaged"),
            Some(&FieldType::Integer)
        );
    }
}
