//! # Catalog Harness
//!
//! A batch catalog ingestion and analytics pipeline for e-commerce product
//! data.
//!
//! Catalog Harness normalizes heterogeneous Romanian-language product
//! exports, derives structured attributes via heuristic extraction, and
//! idempotently loads everything into an indexed document store consumed by
//! external REST/dashboard collaborators. Supplier incidents and daily SKU
//! statistics ride the same storage adapter.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌───────────┐
//! │  Exports    │──▶│      Pipeline        │──▶│  SQLite   │
//! │ CSV batches │   │ Normalize + Extract  │   │ (idx, id) │
//! └─────────────┘   └──────────────────────┘   └─────┬─────┘
//!                                                    │
//!                                  ┌─────────────────┤
//!                                  ▼                 ▼
//!                            ┌──────────┐      ┌──────────┐
//!                            │   CLI    │      │ REST/UI  │
//!                            │  (cata)  │      │(external)│
//!                            └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cata init                         # create database and index mappings
//! cata ingest products              # ingest the latest product export
//! cata ingest orders                # aggregate orders into daily stats
//! cata get GN-001                   # fetch a product by SKU
//! cata validate products            # data-quality report
//! cata report damage-rate           # supplier damage analytics
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Header mapping and value coercion |
//! | [`extract`] | Heuristic attribute extraction |
//! | [`mappings`] | Mapping-defined index specs |
//! | [`store`] | Document store trait and backends |
//! | [`ingest`] | Product batch orchestration |
//! | [`daily_stats`] | Orders/returns aggregation |
//! | [`incidents`] | Supplier incident logging and analytics |
//! | [`validate`] | Data-quality reports |
//! | [`migrate`] | Index setup |

pub mod config;
pub mod daily_stats;
pub mod error;
pub mod extract;
pub mod get;
pub mod incidents;
pub mod ingest;
pub mod mappings;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod sources;
pub mod stats;
pub mod store;
pub mod validate;
