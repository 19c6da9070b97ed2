use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use catalog_harness::config::{load_config, Config};
use catalog_harness::daily_stats;
use catalog_harness::incidents;
use catalog_harness::ingest::{self, IngestOptions};
use catalog_harness::migrate;
use catalog_harness::store::sqlite::SqliteStore;
use catalog_harness::store::{DocumentStore, Filter};

/// Ten catalog rows with Romanian headers; row 5 has no SKU.
const PRODUCTS_CSV: &str = "\
Cod Produs (SKU),Denumire Produs,Pret,Pretul Include TVA,Categorie principala,Marca (Brand),Descriere Produs
GN-001,Oja Gel Polish 15ml Rosu Rubin,\"25,90\",Da,Gel Polish,GlamNails,Finisaj lucios pentru lampi UV/LED
GN-002,Oja semipermanenta Colectia Glam 15 ml #A021 Roz,30.00,Da,Gel Polish,GlamNails,Finisaj glitter
GN-003,Degresant acetonă 99% lavandă 30 ml,15.50,Nu,Lichide,PureLab,Degresant profesional
GN-004,Pila banana 180/240 inox,8.00,Da,Accesorii,SteelPro,Pila profesionala din inox de 130 mm
,Produs fara cod,9.99,Da,Diverse,NoBrand,Rand invalid
GN-006,Top Coat Mat 8ml,22.00,Da,Top Coat,GlamNails,Finisaj mat de lunga durata
GN-007,Base Coat 8ml,21.00,Da,Base Coat,GlamNails,Baza aderenta
GN-008,Cleaner 100ml cocos,12.00,Nu,Lichide,PureLab,Cleaner cu miros de cocos
GN-009,Lampa UV LED 48W,199.00,Da,Echipamente,LuxLamp,Lampa profesionala uv/led
GN-010,Set pile semilună,14.00,Da,Accesorii,SteelPro,Set 5 pile forma semilună
";

const ORDERS_CSV: &str = "\
order_date,sku,quantity,line_total
2024-06-01,GN-001,2,51.80
2024-06-01,GN-001,1,25.90
2024-06-02,GN-006,1,22.00
";

const RETURNS_CSV: &str = "\
return_date,sku,quantity
2024-06-01,GN-001,1
";

const INCIDENTS_CSV: &str = "\
incident_id,supplier_id,supplier_name,date_reported,sku,product_type,category_main,qty_total_in_shipment,qty_damaged,damage_type
inc-1,SUP-A,Alfa Distribution,2024-05-10,GN-001,gel,Gel Polish,100,10,\"crapat, varsat\"
inc-2,SUP-A,Alfa Distribution,2024-06-02,GN-003,lichide,Lichide,50,5,varsat
inc-3,SUP-B,Beta Imports,2024-06-20,GN-004,accesorii,Accesorii,200,2,indoit
";

fn setup_test_env() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let raw_dir = root.join("raw");
    fs::create_dir_all(&raw_dir).unwrap();
    fs::write(raw_dir.join("products_2024-06-01.csv"), PRODUCTS_CSV).unwrap();
    fs::write(raw_dir.join("orders_2024-06-01.csv"), ORDERS_CSV).unwrap();
    fs::write(raw_dir.join("returns_2024-06-01.csv"), RETURNS_CSV).unwrap();
    fs::write(raw_dir.join("incidents_2024-06-01.csv"), INCIDENTS_CSV).unwrap();

    let config_content = format!(
        r#"[storage]
path = "{root}/data/catalog.sqlite"

[data]
dir = "{root}/raw"
"#,
        root = root.display()
    );
    let config_path = root.join("catalog.toml");
    fs::write(&config_path, config_content).unwrap();

    let config = load_config(&config_path).unwrap();
    (tmp, config)
}

async fn ingest_products(config: &Config, store: &SqliteStore) -> catalog_harness::models::IngestReport {
    ingest::run_products(config, store, IngestOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    migrate::run_migrations(&config).await.unwrap();
}

#[tokio::test]
async fn test_partial_failure_counts() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();

    let store = SqliteStore::open(&config).await.unwrap();
    let report = ingest_products(&config, &store).await;

    assert_eq!(report.attempted, 10);
    assert_eq!(report.succeeded, 9);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, "row 5");
    assert!(report.failures[0].reason.contains("sku"));

    let stored = store.count("products", &Filter::MatchAll).await.unwrap();
    assert_eq!(stored, 9);
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();

    let first = ingest_products(&config, &store).await;
    let state_after_first = store.query("products", &Filter::MatchAll).await.unwrap();

    let second = ingest_products(&config, &store).await;
    let state_after_second = store.query("products", &Filter::MatchAll).await.unwrap();

    assert_eq!(first.attempted, second.attempted);
    assert_eq!(first.succeeded, second.succeeded);
    assert_eq!(first.failed, second.failed);
    assert_eq!(first.created, 9);
    assert_eq!(second.created, 0);
    assert_eq!(second.noop, 9);
    assert_eq!(state_after_first, state_after_second);
}

#[tokio::test]
async fn test_extracted_attributes_example() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();
    ingest_products(&config, &store).await;

    let doc = store.get("products", "GN-001").await.unwrap().unwrap();
    assert_eq!(doc["attr_volume_ml"], 15.0);
    assert_eq!(doc["attr_shade_color"], "Rosu Rubin");
    assert_eq!(doc["attr_color_name"], "rosu");
    assert_eq!(doc["attr_curing_type"], "UV/LED");
    assert_eq!(doc["category_main"], "Gel Polish");

    // Diacritics in another record survive ingestion end-to-end.
    let doc = store.get("products", "GN-003").await.unwrap().unwrap();
    assert_eq!(doc["name"], "Degresant acetonă 99% lavandă 30 ml");
    assert_eq!(doc["attr_liquid_type"], "aceton");
    assert_eq!(doc["attr_strength_percent"], 99.0);
    assert_eq!(doc["attr_scent"], "lavandă");
}

#[tokio::test]
async fn test_round_trip_by_sku() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();
    ingest_products(&config, &store).await;

    let doc = store.get("products", "GN-001").await.unwrap().unwrap();
    assert_eq!(doc["sku"], "GN-001");
    assert_eq!(doc["name"], "Oja Gel Polish 15ml Rosu Rubin");
    assert_eq!(doc["brand"], "GlamNails");
    assert_eq!(doc["vat_included"], true);
    // "25,90" coerced and stored under the scaled-float mapping
    assert_eq!(doc["price"], 25.9);
}

#[tokio::test]
async fn test_orders_and_returns_merge_into_daily_stats() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();

    let orders = daily_stats::run_orders(&config, &store, None, None)
        .await
        .unwrap();
    assert_eq!(orders.attempted, 2); // two (sku, day) aggregates
    assert_eq!(orders.created, 2);

    let returns = daily_stats::run_returns(&config, &store, None, None)
        .await
        .unwrap();
    assert_eq!(returns.attempted, 1);

    let doc = store
        .get("sku_daily_stats", "GN-001_2024-06-01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["purchases"], 3);
    assert_eq!(doc["revenue"], 77.7);
    assert_eq!(doc["returns"], 1);
}

#[tokio::test]
async fn test_incidents_ingest_and_damage_rates() {
    let (_tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();

    let report = incidents::run_incidents_ingest(&config, &store, None, None)
        .await
        .unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.created, 3);

    let rates = incidents::damage_rate_per_supplier(&store, "supplier_incidents", None)
        .await
        .unwrap();
    assert_eq!(rates.len(), 2);
    let sup_a = rates.iter().find(|r| r.supplier_id == "SUP-A").unwrap();
    assert_eq!(sup_a.qty_total, 150);
    assert_eq!(sup_a.qty_damaged, 15);
    assert!((sup_a.damage_rate - 0.1).abs() < 1e-9);

    let monthly = incidents::monthly_damage_rate_for_supplier(&store, "supplier_incidents", "SUP-A")
        .await
        .unwrap();
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].month, "2024-05");

    let distribution =
        incidents::damage_types_distribution_per_supplier(&store, "supplier_incidents")
            .await
            .unwrap();
    let sup_a = distribution.iter().find(|d| d.supplier_id == "SUP-A").unwrap();
    assert!(sup_a
        .damage_types
        .iter()
        .any(|t| t.damage_type == "varsat" && t.count == 2));
}

#[tokio::test]
async fn test_ingest_without_init_fails_per_record() {
    let (_tmp, config) = setup_test_env();
    // No migrate: the indices were never registered.
    let store = SqliteStore::open(&config).await.unwrap();

    let report = ingest_products(&config, &store).await;
    assert_eq!(report.attempted, 10);
    // Row 5 fails validation; the rest fail at the storage layer.
    assert_eq!(report.failed, 10);
    assert_eq!(report.succeeded, 0);
    assert!(report
        .failures
        .iter()
        .any(|f| f.reason.contains("does not exist")));
}

#[tokio::test]
async fn test_resolves_newest_export() {
    let (tmp, config) = setup_test_env();
    // Drop an older export alongside; resolution must keep the newer file.
    let old = tmp.path().join("raw/products_2023-01-01.csv");
    fs::write(&old, "Cod Produs (SKU),Denumire Produs\nOLD-1,Vechi\n").unwrap();
    let earlier = std::time::SystemTime::now() - std::time::Duration::from_secs(7200);
    fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(earlier)
        .unwrap();

    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();
    ingest_products(&config, &store).await;

    assert!(store.get("products", "OLD-1").await.unwrap().is_none());
    assert!(store.get("products", "GN-001").await.unwrap().is_some());
}

#[tokio::test]
async fn test_explicit_file_override() {
    let (tmp, config) = setup_test_env();
    migrate::run_migrations(&config).await.unwrap();
    let store = SqliteStore::open(&config).await.unwrap();

    let custom: PathBuf = tmp.path().join("raw/manual.csv");
    fs::write(&custom, "sku,name\nMAN-1,Produs manual 10ml\n").unwrap();

    let report = ingest::run_products(
        &config,
        &store,
        IngestOptions {
            file: Some(custom),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(report.attempted, 1);

    let doc = store.get("products", "MAN-1").await.unwrap().unwrap();
    assert_eq!(doc["attr_volume_ml"], 10.0);
}
