//! # Catalog Harness CLI (`cata`)
//!
//! The `cata` binary is the primary interface for Catalog Harness. It
//! provides commands for database initialization, batch ingestion, product
//! retrieval, data-quality validation, and supplier-incident analytics.
//!
//! ## Usage
//!
//! ```bash
//! cata --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cata init` | Create the SQLite database and index mappings |
//! | `cata sources` | Show configured exports and what they resolve to |
//! | `cata ingest products` | Ingest a product catalog export |
//! | `cata ingest orders` | Aggregate an orders export into daily stats |
//! | `cata ingest returns` | Aggregate a returns export into daily stats |
//! | `cata ingest incidents` | Ingest a supplier-incidents export |
//! | `cata ingest all` | Run products, orders, and returns in sequence |
//! | `cata get <sku>` | Retrieve a product document by SKU |
//! | `cata validate products` | Catalog completeness report |
//! | `cata validate incidents` | Incident sanity checks |
//! | `cata report damage-rate` | Damage rate per supplier |
//! | `cata report damage-types` | Damage-type distribution per supplier |
//! | `cata report monthly` | Monthly damage-rate series for one supplier |
//! | `cata stats` | Per-index document counts |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! cata init --config ./config/catalog.toml
//!
//! # Ingest the newest product export from the data directory
//! cata ingest products
//!
//! # Ingest a specific export file into a custom index
//! cata ingest products --file data/raw/products_2024-06-01.csv --index products_staging
//!
//! # Damage rate for one product type
//! cata report damage-rate --product-type "gel"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use catalog_harness::config;
use catalog_harness::daily_stats;
use catalog_harness::get;
use catalog_harness::incidents;
use catalog_harness::ingest::{self, IngestOptions};
use catalog_harness::migrate;
use catalog_harness::sources;
use catalog_harness::stats;
use catalog_harness::store::sqlite::SqliteStore;
use catalog_harness::validate;

/// Catalog Harness CLI — a batch catalog ingestion and analytics pipeline
/// for e-commerce product data.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/catalog.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cata",
    about = "Catalog Harness — a batch catalog ingestion and analytics pipeline for e-commerce product data",
    version,
    long_about = "Catalog Harness normalizes Romanian-language product catalog exports, derives \
    structured attributes via heuristic extraction, and idempotently loads them into an indexed \
    document store, alongside supplier-incident logging and daily SKU statistics."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/catalog.toml`. Storage, index names, export
    /// paths, and extraction overrides are read from this file.
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and index mappings.
    ///
    /// Creates the SQLite database file, the document tables, and the
    /// mapping-defined indices (products, sku_daily_stats,
    /// supplier_incidents). This command is idempotent — running it
    /// multiple times is safe.
    Init,

    /// Show configured exports and what they currently resolve to.
    ///
    /// Useful for verifying the data directory before running an ingest.
    Sources,

    /// Ingest data from an export file.
    Ingest {
        #[command(subcommand)]
        target: IngestTarget,
    },

    /// Retrieve a product document by SKU.
    Get {
        /// Product SKU.
        sku: String,

        /// Print the raw JSON document instead of aligned fields.
        #[arg(long)]
        json: bool,
    },

    /// Data-quality reports.
    Validate {
        #[command(subcommand)]
        target: ValidateTarget,
    },

    /// Supplier damage analytics.
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Per-index document counts and database size.
    Stats,
}

/// Ingestion subcommands, one per export kind.
#[derive(Subcommand)]
enum IngestTarget {
    /// Ingest a product catalog export (Romanian headers).
    ///
    /// Normalizes each row, derives attributes, and upserts by SKU.
    /// A record failure is reported and skipped; the batch continues.
    Products {
        /// Input file; defaults to the configured/newest export.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target index override (defaults to `indices.products`).
        #[arg(long)]
        index: Option<String>,

        /// Maximum number of rows to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Run the pipeline without writing to storage.
        #[arg(long)]
        dry_run: bool,

        /// Print the ingestion report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Aggregate an orders export into per-SKU daily stats.
    Orders {
        /// Input file; defaults to the configured/newest export.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target index override (defaults to `indices.sku_daily_stats`).
        #[arg(long)]
        index: Option<String>,
    },

    /// Aggregate a returns export into per-SKU daily stats.
    Returns {
        /// Input file; defaults to the configured/newest export.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target index override (defaults to `indices.sku_daily_stats`).
        #[arg(long)]
        index: Option<String>,
    },

    /// Ingest a supplier-incidents export.
    Incidents {
        /// Input file; defaults to the configured/newest export.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target index override (defaults to `indices.supplier_incidents`).
        #[arg(long)]
        index: Option<String>,
    },

    /// Run products, orders, and returns ingestion in sequence.
    ///
    /// Products is mandatory; orders and returns are skipped when their
    /// exports cannot be resolved or when explicitly skipped.
    All {
        /// Products export file override.
        #[arg(long)]
        products: Option<PathBuf>,

        /// Orders export file override.
        #[arg(long)]
        orders: Option<PathBuf>,

        /// Returns export file override.
        #[arg(long)]
        returns: Option<PathBuf>,

        /// Skip orders ingestion.
        #[arg(long)]
        skip_orders: bool,

        /// Skip returns ingestion.
        #[arg(long)]
        skip_returns: bool,
    },
}

/// Validation subcommands.
#[derive(Subcommand)]
enum ValidateTarget {
    /// Missing critical fields and derived-attribute coverage.
    Products,
    /// Impossible quantities and missing critical incident fields.
    Incidents,
}

/// Report subcommands.
#[derive(Subcommand)]
enum ReportKind {
    /// Damage rate per supplier.
    DamageRate {
        /// Restrict to one product type.
        #[arg(long)]
        product_type: Option<String>,
    },
    /// Damage rate per supplier and product type.
    DamageRateByType,
    /// Damage-type distribution per supplier.
    DamageTypes,
    /// Monthly damage-rate series for one supplier.
    Monthly {
        /// Supplier identifier.
        #[arg(long)]
        supplier: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Ingest { target } => {
            let store = SqliteStore::open(&cfg).await?;
            match target {
                IngestTarget::Products {
                    file,
                    index,
                    limit,
                    dry_run,
                    json,
                } => {
                    ingest::run_products(
                        &cfg,
                        &store,
                        IngestOptions {
                            file,
                            index,
                            limit,
                            dry_run,
                            json,
                        },
                    )
                    .await?;
                }
                IngestTarget::Orders { file, index } => {
                    daily_stats::run_orders(&cfg, &store, file, index).await?;
                }
                IngestTarget::Returns { file, index } => {
                    daily_stats::run_returns(&cfg, &store, file, index).await?;
                }
                IngestTarget::Incidents { file, index } => {
                    incidents::run_incidents_ingest(&cfg, &store, file, index).await?;
                }
                IngestTarget::All {
                    products,
                    orders,
                    returns,
                    skip_orders,
                    skip_returns,
                } => {
                    ingest::run_products(
                        &cfg,
                        &store,
                        IngestOptions {
                            file: products,
                            ..Default::default()
                        },
                    )
                    .await?;

                    if skip_orders {
                        println!("orders ingestion skipped");
                    } else {
                        match daily_stats::run_orders(&cfg, &store, orders, None).await {
                            Ok(_) => {}
                            Err(e) => println!("orders ingestion skipped: {}", e),
                        }
                    }

                    if skip_returns {
                        println!("returns ingestion skipped");
                    } else {
                        match daily_stats::run_returns(&cfg, &store, returns, None).await {
                            Ok(_) => {}
                            Err(e) => println!("returns ingestion skipped: {}", e),
                        }
                    }
                }
            }
            store.close().await;
        }
        Commands::Get { sku, json } => {
            let store = SqliteStore::open(&cfg).await?;
            get::run_get(&cfg, &store, &sku, json).await?;
            store.close().await;
        }
        Commands::Validate { target } => {
            let store = SqliteStore::open(&cfg).await?;
            match target {
                ValidateTarget::Products => {
                    validate::run_validate_products(&cfg, &store).await?;
                }
                ValidateTarget::Incidents => {
                    validate::run_validate_incidents(&cfg, &store).await?;
                }
            }
            store.close().await;
        }
        Commands::Report { kind } => {
            let store = SqliteStore::open(&cfg).await?;
            match kind {
                ReportKind::DamageRate { product_type } => {
                    incidents::run_damage_rate_report(&cfg, &store, product_type.as_deref())
                        .await?;
                }
                ReportKind::DamageRateByType => {
                    incidents::run_damage_rate_by_type_report(&cfg, &store).await?;
                }
                ReportKind::DamageTypes => {
                    incidents::run_damage_types_report(&cfg, &store).await?;
                }
                ReportKind::Monthly { supplier } => {
                    incidents::run_monthly_report(&cfg, &store, &supplier).await?;
                }
            }
            store.close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
