//! End-to-end scenarios exercised against `MockDriver`: the same
//! generation cycle a real backend would run, minus the SQL.

use std::collections::HashMap;

use seedforge_core::driver::mock::MockDriver;
use seedforge_core::schema::types::{Column, ConstraintValue, Constraints, DatabaseSchema, DatabaseType, ForeignKey, PrimaryKey, Table};
use seedforge_core::{Error, GenerateRequest};

fn auto_pk(name: &str) -> Column {
    let mut c = Column::new(name, "integer");
    c.is_primary = true;
    c.is_auto_increment = true;
    c.is_nullable = false;
    c
}

fn fk_column(name: &str, parent: &str, nullable: bool) -> Column {
    let mut c = Column::new(name, "integer");
    c.is_foreign_key = true;
    c.is_nullable = nullable;
    c.referenced_table = Some(parent.to_string());
    c
}

fn text_column(name: &str, nullable: bool) -> Column {
    let mut c = Column::new(name, "varchar(100)");
    c.is_nullable = nullable;
    c.length = Some(100);
    c
}

/// S1: a parent/child pair generates the parent first, sized off the density
/// ratio, and every child row's FK points at a row that actually exists.
#[tokio::test]
async fn s1_parent_child_pair_generates_consistent_fk_values() {
    let mut users = Table::new("users");
    users.columns.insert("id".to_string(), auto_pk("id"));
    users.columns.insert("name".to_string(), text_column("name", false));
    users.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

    let mut orders = Table::new("orders");
    orders.columns.insert("id".to_string(), auto_pk("id"));
    orders.columns.insert("user_id".to_string(), fk_column("user_id", "users", false));
    orders.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    orders.foreign_keys.push(ForeignKey {
        source_column: "user_id".to_string(),
        referenced_table: "users".to_string(),
        referenced_column: "id".to_string(),
    });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("users".to_string(), users);
    schema.tables.insert("orders".to_string(), orders);

    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL);
    let request = GenerateRequest { fk_density_ratio: 10, seed: Some(42), ..GenerateRequest::new("orders", 40) };
    let result = seedforge_core::generate(&driver, &request).await.unwrap();

    let orders_result = result.tables.iter().find(|t| t.table == "orders").unwrap();
    assert_eq!(orders_result.rows_generated, 40);
    let users_result = result.tables.iter().find(|t| t.table == "users").unwrap();
    assert_eq!(users_result.rows_generated, 4);

    assert_eq!(driver.row_count("orders"), 40);
    assert_eq!(driver.row_count("users"), 4);
}

/// S2: composite FK columns referencing the same parent draw from the same
/// parent row within a single row (or are both NULL together).
#[tokio::test]
async fn s2_composite_fk_columns_stay_consistent_within_a_row() {
    let mut regions = Table::new("regions");
    regions.columns.insert("code".to_string(), {
        let mut c = Column::new("code", "varchar(10)");
        c.is_primary = true;
        c.is_nullable = false;
        c.length = Some(10);
        c
    });
    regions.primary_key = Some(PrimaryKey { columns: vec!["code".to_string()] });

    let mut cities = Table::new("cities");
    cities.columns.insert("id".to_string(), auto_pk("id"));
    cities.columns.insert("home_region".to_string(), fk_column("home_region", "regions", false));
    cities.columns.insert("billing_region".to_string(), fk_column("billing_region", "regions", false));
    cities.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    cities.foreign_keys.push(ForeignKey {
        source_column: "home_region".to_string(),
        referenced_table: "regions".to_string(),
        referenced_column: "code".to_string(),
    });
    cities.foreign_keys.push(ForeignKey {
        source_column: "billing_region".to_string(),
        referenced_table: "regions".to_string(),
        referenced_column: "code".to_string(),
    });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("regions".to_string(), regions);
    schema.tables.insert("cities".to_string(), cities);

    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL);
    let request = GenerateRequest { fk_density_ratio: 5, seed: Some(7), ..GenerateRequest::new("cities", 25) };
    let result = seedforge_core::generate(&driver, &request).await.unwrap();

    let cities_result = result.tables.iter().find(|t| t.table == "cities").unwrap();
    assert_eq!(cities_result.rows_generated, 25);
    assert!(driver.row_count("regions") > 1, "test needs multiple parent rows to be meaningful");

    let rows = seedforge_core::Driver::get_rows(&driver, "cities", 100, 0).await.unwrap();
    for row in rows {
        assert_eq!(
            row.get("home_region"),
            row.get("billing_region"),
            "both composite-FK columns must resolve to the same parent row"
        );
    }
}

/// S3: a foreign-key cycle is reported as a structural error before any row
/// is written, not as a per-row generation failure.
#[tokio::test]
async fn s3_cycle_aborts_before_any_row_is_written() {
    let mut a = Table::new("a");
    a.columns.insert("id".to_string(), auto_pk("id"));
    a.columns.insert("b_id".to_string(), fk_column("b_id", "b", false));
    a.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    a.foreign_keys.push(ForeignKey { source_column: "b_id".to_string(), referenced_table: "b".to_string(), referenced_column: "id".to_string() });

    let mut b = Table::new("b");
    b.columns.insert("id".to_string(), auto_pk("id"));
    b.columns.insert("a_id".to_string(), fk_column("a_id", "a", false));
    b.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    b.foreign_keys.push(ForeignKey { source_column: "a_id".to_string(), referenced_table: "a".to_string(), referenced_column: "id".to_string() });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("a".to_string(), a);
    schema.tables.insert("b".to_string(), b);

    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL);
    let request = GenerateRequest::new("a", 10);
    let err = seedforge_core::generate(&driver, &request).await.unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
    assert_eq!(driver.row_count("a"), 0);
    assert_eq!(driver.row_count("b"), 0);
}

/// S4: a blocked parent table contributes its existing rows as FK sources
/// instead of receiving newly generated ones.
#[tokio::test]
async fn s4_blocked_parent_reuses_existing_rows_as_fk_source() {
    let mut tenants = Table::new("tenants");
    tenants.columns.insert("id".to_string(), auto_pk("id"));
    tenants.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

    let mut projects = Table::new("projects");
    projects.columns.insert("id".to_string(), auto_pk("id"));
    projects.columns.insert("tenant_id".to_string(), fk_column("tenant_id", "tenants", false));
    projects.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    projects.foreign_keys.push(ForeignKey {
        source_column: "tenant_id".to_string(),
        referenced_table: "tenants".to_string(),
        referenced_column: "id".to_string(),
    });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("tenants".to_string(), tenants);
    schema.tables.insert("projects".to_string(), projects);

    let mut existing_tenant = indexmap::IndexMap::new();
    existing_tenant.insert("id".to_string(), "1".to_string());

    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL)
        .with_blocked_table("tenants")
        .with_existing_rows("tenants", vec![existing_tenant]);

    let request = GenerateRequest::new("projects", 15);
    let result = seedforge_core::generate(&driver, &request).await.unwrap();

    let tenants_result = result.tables.iter().find(|t| t.table == "tenants").unwrap();
    assert!(tenants_result.used_existing_data);
    assert_eq!(tenants_result.rows_generated, 0);
    assert_eq!(driver.row_count("tenants"), 1, "blocked table must not receive new rows");

    let projects_result = result.tables.iter().find(|t| t.table == "projects").unwrap();
    assert_eq!(projects_result.rows_generated, 15);
}

/// S5: CHECK-style `check_values` constraints are honored by every generated
/// row for that column.
#[tokio::test]
async fn s5_check_values_constraint_is_always_honored() {
    let mut orders = Table::new("orders");
    orders.columns.insert("id".to_string(), auto_pk("id"));
    orders.columns.insert("status".to_string(), text_column("status", false));
    orders.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("orders".to_string(), orders);

    let mut constraints = Constraints::default();
    constraints.0.insert(
        "check_values".to_string(),
        ConstraintValue::StringList(vec!["pending".to_string(), "shipped".to_string(), "cancelled".to_string()]),
    );

    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL).with_column_constraints("orders", "status", constraints);

    let request = GenerateRequest { seed: Some(99), ..GenerateRequest::new("orders", 30) };
    seedforge_core::generate(&driver, &request).await.unwrap();

    let allowed: HashMap<&str, ()> = [("pending", ()), ("shipped", ()), ("cancelled", ())].into_iter().collect();
    let rows = seedforge_core::Driver::get_rows(&driver, "orders", 100, 0).await.unwrap();
    assert_eq!(rows.len(), 30);
    for row in rows {
        let status = row.get("status").expect("status column present");
        assert!(allowed.contains_key(status.as_str()), "unexpected status value: {status}");
    }
}

/// S6: a non-nullable foreign key with no candidate parent rows is a per-row
/// policy failure, surfaced as a warning rather than aborting the whole run.
#[tokio::test]
async fn s6_non_nullable_fk_with_no_parent_rows_is_a_warning_not_an_abort() {
    let mut parents = Table::new("parents");
    parents.columns.insert("id".to_string(), auto_pk("id"));
    parents.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

    let mut children = Table::new("children");
    children.columns.insert("id".to_string(), auto_pk("id"));
    children.columns.insert("parent_id".to_string(), fk_column("parent_id", "parents", false));
    children.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    children.foreign_keys.push(ForeignKey {
        source_column: "parent_id".to_string(),
        referenced_table: "parents".to_string(),
        referenced_column: "id".to_string(),
    });

    let mut schema = DatabaseSchema::new();
    schema.tables.insert("parents".to_string(), parents);
    schema.tables.insert("children".to_string(), children);

    // Blocking "parents" with zero existing rows means children can never
    // find a parent to reference, but the run should still complete.
    let driver = MockDriver::new(schema, DatabaseType::PostgreSQL).with_blocked_table("parents");

    let request = GenerateRequest::new("children", 5);
    let result = seedforge_core::generate(&driver, &request).await.unwrap();

    let children_result = result.tables.iter().find(|t| t.table == "children").unwrap();
    assert_eq!(children_result.rows_generated, 0);
    assert!(result.warnings.iter().any(|w| w.contains("children") && w.contains("skipped")));
}
