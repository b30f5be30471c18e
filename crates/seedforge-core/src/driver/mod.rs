//! External Driver capability surface: the abstract boundary between
//! the generation core and a concrete backend (Postgres, MySQL, SQLite, or a
//! test double). Everything upstream of this module only ever sees `Record`s
//! and typed column descriptors — no SQL, no connection pooling.

pub mod mock;

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;
use crate::generate::value::Record;
use crate::schema::types::{Column, Constraints, DatabaseType, ForeignKey, PrimaryKey, Table};

/// One node of the dependency graph as reported by a driver's own
/// introspection: a table and the tables that reference it.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub table: String,
    pub children: Vec<String>,
}

/// The capability surface every backend implements. Consumed as
/// `&dyn Driver` throughout the orchestrator so the generation core never
/// depends on a concrete backend crate.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn get_database_metadata(&self) -> Result<DatabaseType>;

    /// Whether mock data may be written to `table` at all. A `false` marks
    /// the table "blocked":
    /// the orchestrator reads its existing rows as FK sources instead of
    /// generating new ones.
    async fn is_mock_data_generation_allowed(&self, table: &str) -> Result<bool>;

    async fn get_columns_for_table(&self, table: &str) -> Result<Vec<Column>>;

    async fn get_foreign_key_relationships(&self, table: &str) -> Result<Vec<ForeignKey>>;

    async fn get_column_constraints(&self, table: &str) -> Result<HashMap<String, Constraints>>;

    /// Paged read of existing rows, newest-agnostic (no ordering guarantee
    /// beyond what the backend returns naturally).
    async fn get_rows(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<IndexMap<String, String>>>;

    /// Single-row insert. Returns the generated auto-increment ID, or `0`
    /// when the table has none.
    async fn add_row_returning_id(&self, table: &str, record: &[Record]) -> Result<i64>;

    /// Batched insert for the target table, where individual IDs are not
    /// needed by any child.
    async fn bulk_add_rows(&self, table: &str, records: &[Vec<Record>]) -> Result<bool>;

    async fn clear_table_data(&self, table: &str) -> Result<bool>;

    /// The full dependency graph known to the backend, used for FK-safe
    /// cascading clearance. Drivers that cannot cheaply compute this
    /// may return an error; the orchestrator falls back to clearing only the
    /// target table.
    async fn get_graph(&self) -> Result<Vec<GraphNode>>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;
}

/// Assemble a `Table` from a driver's column and FK introspection calls.
/// Every caller that needs a full table shape (dependency analysis, row
/// generation) goes through this rather than re-deriving it inline.
pub async fn load_table(driver: &dyn Driver, name: &str) -> Result<Table> {
    let columns = driver.get_columns_for_table(name).await?;
    // A driver that cannot resolve FK relationships for a table is treated
    // as having none, rather than failing dependency discovery outright.
    let foreign_keys = driver.get_foreign_key_relationships(name).await.unwrap_or_default();

    let mut table = Table::new(name);
    let pk_columns: Vec<String> = columns.iter().filter(|c| c.is_primary).map(|c| c.name.clone()).collect();

    for mut column in columns {
        if let Some(fk) = foreign_keys.iter().find(|fk| fk.source_column == column.name) {
            column.is_foreign_key = true;
            column.referenced_table = Some(fk.referenced_table.clone());
        }
        table.columns.insert(column.name.clone(), column);
    }

    if !pk_columns.is_empty() {
        table.primary_key = Some(PrimaryKey { columns: pk_columns });
    }
    table.foreign_keys = foreign_keys;

    Ok(table)
}
