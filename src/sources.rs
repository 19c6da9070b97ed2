//! Export file resolution and listing.
//!
//! Upstream platforms drop timestamped exports into a data directory
//! (`products_2024-06-01.csv`, …). A configured export entry may therefore
//! be a concrete file, a directory to search, or a glob; directories and
//! globs resolve to the most recently modified match so a sync always picks
//! up the latest export.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::Glob;
use walkdir::WalkDir;

use crate::config::Config;

/// The export a command wants to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Products,
    Orders,
    Returns,
    Incidents,
}

impl ExportKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExportKind::Products => "products",
            ExportKind::Orders => "orders",
            ExportKind::Returns => "returns",
            ExportKind::Incidents => "incidents",
        }
    }

    fn default_pattern(&self) -> &'static str {
        match self {
            ExportKind::Products => "products_*.csv",
            ExportKind::Orders => "orders_*.csv",
            ExportKind::Returns => "returns_*.csv",
            ExportKind::Incidents => "incidents_*.csv",
        }
    }

    fn configured<'a>(&self, config: &'a Config) -> Option<&'a str> {
        let data = &config.data;
        match self {
            ExportKind::Products => data.products_export.as_deref(),
            ExportKind::Orders => data.orders_export.as_deref(),
            ExportKind::Returns => data.returns_export.as_deref(),
            ExportKind::Incidents => data.incidents_export.as_deref(),
        }
    }
}

/// Resolve the input file for an export kind.
///
/// Precedence: explicit `--file` override, then the configured entry, then
/// the newest default-pattern match in the data directory. Fails when
/// nothing resolves to an existing file, since ingestion must abort before
/// processing any record.
pub fn resolve_export(
    config: &Config,
    kind: ExportKind,
    override_path: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        bail!("input file not found: {}", path.display());
    }

    match kind.configured(config) {
        Some(value) => {
            let candidate = PathBuf::from(value);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if candidate.is_dir() {
                if let Some(found) = newest_match(&candidate, kind.default_pattern())? {
                    return Ok(found);
                }
                bail!(
                    "no {} export matching '{}' in {}",
                    kind.label(),
                    kind.default_pattern(),
                    candidate.display()
                );
            }
            // Treat the value as a glob over the data directory.
            if let Some(found) = newest_match(&config.data.dir, value)? {
                return Ok(found);
            }
            bail!("no file found for {} export '{}'", kind.label(), value);
        }
        None => {
            if let Some(found) = newest_match(&config.data.dir, kind.default_pattern())? {
                return Ok(found);
            }
            bail!(
                "no {} export configured and no '{}' match in {}",
                kind.label(),
                kind.default_pattern(),
                config.data.dir.display()
            );
        }
    }
}

/// Newest file in `dir` whose name matches `pattern`. Ties on modification
/// time break by path for determinism.
fn newest_match(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let glob = Glob::new(pattern)
        .with_context(|| format!("invalid export pattern: {}", pattern))?
        .compile_matcher();

    let mut best: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !glob.is_match(name.as_ref()) {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        let path = entry.path().to_path_buf();
        let newer = match &best {
            Some((best_time, best_path)) => {
                modified > *best_time || (modified == *best_time && path < *best_path)
            }
            None => true,
        };
        if newer {
            best = Some((modified, path));
        }
    }
    Ok(best.map(|(_, path)| path))
}

/// `cata sources`: show each export kind and what it currently resolves to.
pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<40} RESOLVED", "EXPORT", "CONFIGURED");
    for kind in [
        ExportKind::Products,
        ExportKind::Orders,
        ExportKind::Returns,
        ExportKind::Incidents,
    ] {
        let configured = kind
            .configured(config)
            .map(str::to_string)
            .unwrap_or_else(|| format!("(auto: {})", kind.default_pattern()));
        let resolved = match resolve_export(config, kind, None) {
            Ok(path) => path.display().to_string(),
            Err(_) => "NOT FOUND".to_string(),
        };
        println!("{:<12} {:<40} {}", kind.label(), configured, resolved);
    }

    println!();
    println!(
        "storage: {} ({})",
        config.storage.path.display(),
        if config.storage.path.exists() {
            "present"
        } else {
            "missing — run `cata init`"
        }
    );

    Ok(())
}
