use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use seedforge_core::driver::load_table;
use seedforge_core::schema::types::DatabaseSchema;
use seedforge_core::Driver;

use crate::args::{IntrospectArgs, IntrospectFormat};
use crate::commands::{connect, resolve_db_url, resolve_schema};
use crate::config;

pub async fn run(args: &IntrospectArgs) -> Result<()> {
    let cfg = config::read_config(&config::default_config_dir())?;
    let db_url = resolve_db_url(args.db.as_deref(), cfg.as_ref())?;
    let schema_name = resolve_schema(args.schema.as_deref(), cfg.as_ref());

    let driver = connect(&db_url, schema_name.as_deref(), Vec::new()).await?;
    let db_type = driver.get_database_metadata().await?;
    let schema = build_schema(driver.as_ref()).await?;

    match args.format {
        IntrospectFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        IntrospectFormat::Table => {
            let column_count: usize = schema.tables.values().map(|t| t.columns.len()).sum();
            let fk_count: usize = schema.tables.values().map(|t| t.foreign_keys.len()).sum();
            println!("Database type: {db_type}");
            println!("Tables: {}  Columns: {}  Foreign keys: {}\n", schema.table_count(), column_count, fk_count);

            for (table_name, table) in &schema.tables {
                println!("━━━ {table_name} ━━━");
                let constraints = driver.get_column_constraints(table_name).await?;

                let pk_columns: Vec<&str> =
                    table.primary_key.as_ref().map(|pk| pk.columns.iter().map(|s| s.as_str()).collect()).unwrap_or_default();

                let mut t = ComfyTable::new();
                t.set_header(vec!["Column", "Type", "Nullable", "PK", "Auto-inc", "FK", "Constraints"]);

                for (col_name, column) in &table.columns {
                    let is_pk = pk_columns.contains(&col_name.as_str());
                    let fk_target = table
                        .foreign_keys
                        .iter()
                        .find(|fk| &fk.source_column == col_name)
                        .map(|fk| format!("→ {}.{}", fk.referenced_table, fk.referenced_column));

                    let constraint_summary = constraints
                        .get(col_name)
                        .map(describe_constraints)
                        .unwrap_or_default();

                    t.add_row(vec![
                        Cell::new(col_name),
                        Cell::new(&column.raw_type),
                        Cell::new(if column.is_nullable { "YES" } else { "NO" }),
                        Cell::new(if is_pk { "PK" } else { "" }),
                        Cell::new(if column.is_auto_increment { "auto" } else { "" }),
                        Cell::new(fk_target.as_deref().unwrap_or("")),
                        Cell::new(&constraint_summary),
                    ]);
                }

                println!("{t}\n");
            }
        }
    }

    Ok(())
}

/// Assemble a full `DatabaseSchema` from a driver's per-table introspection
/// calls, table list sourced from `GetGraph` since the `Driver`
/// interface has no single "list all tables" operation.
async fn build_schema(driver: &dyn Driver) -> Result<DatabaseSchema> {
    let mut schema = DatabaseSchema::new();
    let nodes = driver.get_graph().await?;
    for node in nodes {
        let table = load_table(driver, &node.table).await?;
        schema.tables.insert(node.table, table);
    }
    Ok(schema)
}

fn describe_constraints(c: &seedforge_core::schema::types::Constraints) -> String {
    let mut parts = Vec::new();
    if let Some(values) = c.check_values() {
        parts.push(format!("IN ({})", values.join(", ")));
    }
    match (c.check_min(), c.check_max()) {
        (Some(min), Some(max)) => parts.push(format!("[{min}, {max}]")),
        (Some(min), None) => parts.push(format!(">= {min}")),
        (None, Some(max)) => parts.push(format!("<= {max}")),
        (None, None) => {}
    }
    if let Some(len) = c.length() {
        parts.push(format!("len <= {len}"));
    }
    parts.join(" ")
}
