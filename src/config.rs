use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub indices: IndicesConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

/// Names of the three indices the pipeline writes to.
#[derive(Debug, Deserialize, Clone)]
pub struct IndicesConfig {
    #[serde(default = "default_products_index")]
    pub products: String,
    #[serde(default = "default_sku_daily_stats_index")]
    pub sku_daily_stats: String,
    #[serde(default = "default_supplier_incidents_index")]
    pub supplier_incidents: String,
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            products: default_products_index(),
            sku_daily_stats: default_sku_daily_stats_index(),
            supplier_incidents: default_supplier_incidents_index(),
        }
    }
}

fn default_products_index() -> String {
    "products".to_string()
}
fn default_sku_daily_stats_index() -> String {
    "sku_daily_stats".to_string()
}
fn default_supplier_incidents_index() -> String {
    "supplier_incidents".to_string()
}

/// Where to find the export files. Each entry may be a file path, a
/// directory (searched for the newest match of the default pattern), or a
/// glob relative to `dir`.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub products_export: Option<String>,
    #[serde(default)]
    pub orders_export: Option<String>,
    #[serde(default)]
    pub returns_export: Option<String>,
    #[serde(default)]
    pub incidents_export: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            products_export: None,
            orders_export: None,
            returns_export: None,
            incidents_export: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

/// Overrides for the extractor's keyword tables. Unset tables fall back to
/// the built-in Romanian defaults; the regex patterns are not configurable.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub finish_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub curing_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub liquid_types: Option<Vec<String>>,
    #[serde(default)]
    pub scent_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub material_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub shape_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub color_keywords: Option<Vec<String>>,
}

impl ExtractionConfig {
    fn keyword_tables(&self) -> [(&'static str, &Option<Vec<String>>); 7] {
        [
            ("finish_keywords", &self.finish_keywords),
            ("curing_keywords", &self.curing_keywords),
            ("liquid_types", &self.liquid_types),
            ("scent_keywords", &self.scent_keywords),
            ("material_keywords", &self.material_keywords),
            ("shape_keywords", &self.shape_keywords),
            ("color_keywords", &self.color_keywords),
        ]
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate index names
    for (label, name) in [
        ("indices.products", &config.indices.products),
        ("indices.sku_daily_stats", &config.indices.sku_daily_stats),
        (
            "indices.supplier_incidents",
            &config.indices.supplier_incidents,
        ),
    ] {
        if name.trim().is_empty() {
            anyhow::bail!("{} must not be empty", label);
        }
    }

    // Validate extraction overrides: a table may be replaced but not emptied,
    // and keywords must survive lowercasing intact.
    for (label, table) in config.extraction.keyword_tables() {
        if let Some(keywords) = table {
            if keywords.is_empty() {
                anyhow::bail!("extraction.{} must not be an empty list", label);
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                anyhow::bail!("extraction.{} contains a blank keyword", label);
            }
        }
    }

    Ok(config)
}
