//! Integration tests against the shared schema fixtures, exercising the
//! same end-to-end path as `scenarios.rs` but on schemas that weren't
//! purpose-built for a single invariant: a realistic multi-table schema,
//! a schema with a genuine FK cycle, and a composite-PK schema.

use seedforge_core::driver::mock::MockDriver;
use seedforge_core::schema::types::DatabaseType;
use seedforge_core::{Error, GenerateRequest};
use seedforge_testutil::{composite_key_schema, cyclic_schema, ecommerce_schema};

#[tokio::test]
async fn ecommerce_schema_generates_full_dependency_closure_in_order() {
    let driver = MockDriver::new(ecommerce_schema(), DatabaseType::PostgreSQL);
    let request = GenerateRequest { fk_density_ratio: 5, seed: Some(11), ..GenerateRequest::new("order_items", 50) };
    let result = seedforge_core::generate(&driver, &request).await.unwrap();

    for table in ["users", "categories", "products", "orders", "order_items"] {
        assert!(result.tables.iter().any(|t| t.table == table), "missing table in result: {table}");
    }

    let order_items = result.tables.iter().find(|t| t.table == "order_items").unwrap();
    assert_eq!(order_items.rows_generated, 50);
    assert_eq!(driver.row_count("order_items"), 50);

    let order_item_rows = seedforge_core::Driver::get_rows(&driver, "order_items", 200, 0).await.unwrap();
    let order_rows = seedforge_core::Driver::get_rows(&driver, "orders", 200, 0).await.unwrap();
    for item in &order_item_rows {
        let order_id = item.get("order_id").unwrap();
        assert!(order_rows.iter().any(|o| o.get("id") == Some(order_id)), "order_items.order_id must reference an existing order");
    }
}

#[tokio::test]
async fn cyclic_schema_is_rejected_before_any_insert() {
    let driver = MockDriver::new(cyclic_schema(), DatabaseType::PostgreSQL);
    let request = GenerateRequest::new("employees", 10);
    let err = seedforge_core::generate(&driver, &request).await.unwrap_err();

    match err {
        Error::Cycle { tables } => {
            assert!(tables.contains("employees") && tables.contains("departments"));
        }
        other => panic!("expected Error::Cycle, got {other:?}"),
    }
    assert_eq!(driver.row_count("employees"), 0);
    assert_eq!(driver.row_count("departments"), 0);
}

#[tokio::test]
async fn composite_key_schema_keeps_city_fk_columns_consistent() {
    let driver = MockDriver::new(composite_key_schema(), DatabaseType::PostgreSQL);
    let request = GenerateRequest { fk_density_ratio: 4, seed: Some(3), ..GenerateRequest::new("cities", 30) };
    seedforge_core::generate(&driver, &request).await.unwrap();

    let rows = seedforge_core::Driver::get_rows(&driver, "cities", 100, 0).await.unwrap();
    assert_eq!(rows.len(), 30);

    let region_rows = seedforge_core::Driver::get_rows(&driver, "regions", 100, 0).await.unwrap();
    for city in &rows {
        let matched = region_rows
            .iter()
            .any(|r| r.get("country") == city.get("country") && r.get("code") == city.get("region_code"));
        assert!(matched, "city's (country, region_code) must match a generated region row");
    }
}
