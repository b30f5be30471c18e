//! Schema fixtures shared by `seedforge-core`'s integration tests and by
//! `seedforge-drivers`' doc examples. Nothing here talks to a real
//! database — these are plain `DatabaseSchema` literals standing in for
//! what a driver's introspection calls would otherwise return.

use seedforge_core::schema::types::{Column, DatabaseSchema, ForeignKey, PrimaryKey, Table};

fn auto_increment_pk(name: &str) -> Column {
    let mut c = Column::new(name, "serial");
    c.is_primary = true;
    c.is_auto_increment = true;
    c.is_nullable = false;
    c
}

fn not_null(mut c: Column) -> Column {
    c.is_nullable = false;
    c
}

fn varchar(name: &str, length: u32) -> Column {
    let mut c = Column::new(name, "character varying");
    c.length = Some(length);
    c
}

fn fk(source_column: &str, referenced_table: &str, referenced_column: &str) -> ForeignKey {
    ForeignKey {
        source_column: source_column.to_string(),
        referenced_table: referenced_table.to_string(),
        referenced_column: referenced_column.to_string(),
    }
}

/// A small e-commerce schema: `users` -> `orders` -> `order_items` <-
/// `products` <- `categories` (self-referencing for subcategories).
///
/// Exercises ordinary single-column FKs, a self-reference on `categories`,
/// and a table (`order_items`) with two FK columns pointing at different
/// parents — useful for dependency-analyzer and row-builder tests that
/// don't need composite-FK consistency specifically.
pub fn ecommerce_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new();

    let mut users = Table::new("users");
    users.columns.insert("id".to_string(), auto_increment_pk("id"));
    users.columns.insert("email".to_string(), not_null(varchar("email", 255)));
    users.columns.insert("first_name".to_string(), varchar("first_name", 100));
    users.columns.insert("last_name".to_string(), varchar("last_name", 100));
    users.columns.insert("is_active".to_string(), Column::new("is_active", "boolean"));
    users.columns.insert("created_at".to_string(), Column::new("created_at", "timestamp with time zone"));
    users.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    schema.tables.insert("users".to_string(), users);

    let mut categories = Table::new("categories");
    categories.columns.insert("id".to_string(), auto_increment_pk("id"));
    categories.columns.insert("name".to_string(), not_null(varchar("name", 100)));
    categories.columns.insert("parent_id".to_string(), Column::new("parent_id", "integer"));
    categories.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    categories.foreign_keys.push(fk("parent_id", "categories", "id"));
    schema.tables.insert("categories".to_string(), categories);

    let mut products = Table::new("products");
    products.columns.insert("id".to_string(), auto_increment_pk("id"));
    products.columns.insert("name".to_string(), not_null(varchar("name", 200)));
    products.columns.insert("description".to_string(), Column::new("description", "text"));
    products.columns.insert("price".to_string(), not_null(Column::new("price", "numeric(10,2)")));
    products.columns.insert("category_id".to_string(), Column::new("category_id", "integer"));
    products.columns.insert("sku".to_string(), varchar("sku", 64));
    products.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    products.foreign_keys.push(fk("category_id", "categories", "id"));
    schema.tables.insert("products".to_string(), products);

    let mut orders = Table::new("orders");
    orders.columns.insert("id".to_string(), auto_increment_pk("id"));
    orders.columns.insert("user_id".to_string(), not_null(Column::new("user_id", "integer")));
    orders.columns.insert("status".to_string(), not_null(varchar("status", 20)));
    orders.columns.insert("total".to_string(), Column::new("total", "numeric(10,2)"));
    orders.columns.insert("created_at".to_string(), Column::new("created_at", "timestamp with time zone"));
    orders.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    orders.foreign_keys.push(fk("user_id", "users", "id"));
    schema.tables.insert("orders".to_string(), orders);

    let mut order_items = Table::new("order_items");
    order_items.columns.insert("id".to_string(), auto_increment_pk("id"));
    order_items.columns.insert("order_id".to_string(), not_null(Column::new("order_id", "integer")));
    order_items.columns.insert("product_id".to_string(), not_null(Column::new("product_id", "integer")));
    order_items.columns.insert("quantity".to_string(), not_null(Column::new("quantity", "integer")));
    order_items.columns.insert("unit_price".to_string(), Column::new("unit_price", "numeric(10,2)"));
    order_items.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    order_items.foreign_keys.push(fk("order_id", "orders", "id"));
    order_items.foreign_keys.push(fk("product_id", "products", "id"));
    schema.tables.insert("order_items".to_string(), order_items);

    schema
}

/// A schema containing a true FK cycle (`employees.manager_id` is a
/// self-reference, `employees` <-> `departments` is a mutual cycle), for
/// exercising the dependency analyzer's cycle detection.
pub fn cyclic_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new();

    let mut employees = Table::new("employees");
    employees.columns.insert("id".to_string(), auto_increment_pk("id"));
    employees.columns.insert("name".to_string(), varchar("name", 200));
    employees.columns.insert("manager_id".to_string(), Column::new("manager_id", "integer"));
    employees.columns.insert("department_id".to_string(), Column::new("department_id", "integer"));
    employees.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    employees.foreign_keys.push(fk("manager_id", "employees", "id"));
    employees.foreign_keys.push(fk("department_id", "departments", "id"));
    schema.tables.insert("employees".to_string(), employees);

    let mut departments = Table::new("departments");
    departments.columns.insert("id".to_string(), auto_increment_pk("id"));
    departments.columns.insert("name".to_string(), varchar("name", 200));
    departments.columns.insert("head_id".to_string(), not_null(Column::new("head_id", "integer")));
    departments.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    departments.foreign_keys.push(fk("head_id", "employees", "id"));
    schema.tables.insert("departments".to_string(), departments);

    schema
}

/// `regions(country, code)` with a composite primary key, referenced by a
/// composite FK on `cities(country, region_code)` — exercises composite-FK
/// consistency within a single generated row.
pub fn composite_key_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new();

    let mut regions = Table::new("regions");
    regions.columns.insert("country".to_string(), not_null({
        let mut c = Column::new("country", "char(2)");
        c.is_primary = true;
        c.length = Some(2);
        c
    }));
    regions.columns.insert("code".to_string(), not_null({
        let mut c = Column::new("code", "integer");
        c.is_primary = true;
        c
    }));
    regions.columns.insert("name".to_string(), not_null(varchar("name", 100)));
    regions.primary_key = Some(PrimaryKey { columns: vec!["country".to_string(), "code".to_string()] });
    schema.tables.insert("regions".to_string(), regions);

    let mut cities = Table::new("cities");
    cities.columns.insert("id".to_string(), auto_increment_pk("id"));
    cities.columns.insert("country".to_string(), not_null(Column::new("country", "char(2)")));
    cities.columns.insert("region_code".to_string(), not_null(Column::new("region_code", "integer")));
    cities.columns.insert("name".to_string(), varchar("name", 100));
    cities.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
    cities.foreign_keys.push(fk("country", "regions", "country"));
    cities.foreign_keys.push(fk("region_code", "regions", "code"));
    schema.tables.insert("cities".to_string(), cities);

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecommerce_schema_has_every_table_and_fk_edge() {
        let schema = ecommerce_schema();
        assert_eq!(schema.table_count(), 5);
        assert!(schema.tables["categories"].foreign_keys.iter().any(|f| f.referenced_table == "categories"));
        assert!(schema.tables["order_items"].foreign_keys.len() == 2);
    }

    #[test]
    fn cyclic_schema_is_actually_cyclic() {
        let schema = cyclic_schema();
        let emp_to_dept = schema.tables["employees"].foreign_keys.iter().any(|f| f.referenced_table == "departments");
        let dept_to_emp = schema.tables["departments"].foreign_keys.iter().any(|f| f.referenced_table == "employees");
        assert!(emp_to_dept && dept_to_emp);
    }

    #[test]
    fn composite_key_schema_shares_two_fk_columns_with_one_parent() {
        let schema = composite_key_schema();
        let cities = &schema.tables["cities"];
        assert_eq!(cities.foreign_keys.iter().filter(|f| f.referenced_table == "regions").count(), 2);
        assert_eq!(schema.tables["regions"].trackable_pk_columns(), vec!["country", "code"]);
    }
}
