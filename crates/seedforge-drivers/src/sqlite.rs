//! SQLite `Driver`: `PRAGMA`-based introspection (no
//! `information_schema` to query), single-file database so transactions hold
//! a dedicated connection exactly as the other two backends do.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Column as SqlxColumn, Row, Sqlite, SqlitePool};
use tokio::sync::Mutex;

use seedforge_core::driver::GraphNode;
use seedforge_core::error::Result;
use seedforge_core::generate::value::Record;
use seedforge_core::schema::types::{normalize_type, Column, Constraints, DatabaseType, ForeignKey, TypeClass};
use seedforge_core::Driver;

use crate::support::{driver_error, quote_identifier, sanitize_url, truncate_sql, INSERT_BATCH_SIZE};

pub struct SqliteDriver {
    pool: SqlitePool,
    blocked: HashSet<String>,
    tx_conn: Mutex<Option<PoolConnection<Sqlite>>>,
}

impl SqliteDriver {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(db_url).await.map_err(|e| {
            driver_error("(connect)", None, format!("failed to connect to {}", sanitize_url(db_url)), e)
        })?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool, blocked: HashSet::new(), tx_conn: Mutex::new(None) }
    }

    pub fn with_blocked_tables(mut self, tables: impl IntoIterator<Item = String>) -> Self {
        self.blocked.extend(tables);
        self
    }

    async fn execute(&self, table: &str, query: Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>>) -> Result<u64> {
        let mut guard = self.tx_conn.lock().await;
        let result = if let Some(conn) = guard.as_mut() {
            query.execute(&mut **conn).await
        } else {
            query.execute(&self.pool).await
        };
        result.map(|r| r.rows_affected()).map_err(|e| driver_error(table, None, "statement execution failed", e))
    }

    async fn auto_increment_column(&self, table: &str) -> Result<Option<String>> {
        let columns = self.get_columns_for_table(table).await?;
        Ok(columns.into_iter().find(|c| c.is_auto_increment).map(|c| c.name))
    }
}

fn bind_record<'q>(
    query: Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    record: &Record,
    class: TypeClass,
) -> Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if record.meta.is_null {
        return query.bind(Option::<String>::None);
    }
    match class {
        TypeClass::Int | TypeClass::Uint => match record.value.parse::<i64>() {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(record.value.clone()),
        },
        TypeClass::Float => match record.value.parse::<f64>() {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(record.value.clone()),
        },
        TypeClass::Bool => match record.value.parse::<bool>() {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(record.value.clone()),
        },
        _ => query.bind(record.value.clone()),
    }
}

fn column_type_classes(columns: &[&str], records: &[Record]) -> Vec<TypeClass> {
    columns
        .iter()
        .map(|name| records.iter().find(|r| r.column == *name).map(|r| normalize_type(&r.meta.r#type).class).unwrap_or(TypeClass::Text))
        .collect()
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn get_database_metadata(&self) -> Result<DatabaseType> {
        Ok(DatabaseType::SQLite)
    }

    async fn is_mock_data_generation_allowed(&self, table: &str) -> Result<bool> {
        Ok(!self.blocked.contains(table))
    }

    async fn get_columns_for_table(&self, table: &str) -> Result<Vec<Column>> {
        // `table_xinfo` over plain `table_info`: it's the variant that also
        // reports `hidden`, which is how generated columns surface in SQLite
        // (2 = stored, 3 = virtual; 1 is a hidden virtual-table column, not
        // something we need to distinguish here).
        let sql = format!("PRAGMA table_xinfo({})", quote_identifier(table, DatabaseType::SQLite));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(|e| driver_error(table, None, "fetch columns", e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name");
            let raw_type: String = row.get("type");
            let notnull: i64 = row.get("notnull");
            let pk: i64 = row.get("pk");
            let cid: i64 = row.get("cid");
            let hidden: i64 = row.get("hidden");

            let mut column = Column::new(&name, raw_type.clone());
            column.is_nullable = notnull == 0;
            column.is_primary = pk > 0;
            column.is_auto_increment = pk > 0 && raw_type.to_uppercase().contains("INTEGER");
            column.is_computed = hidden == 2 || hidden == 3;
            column.ordinal_position = cid as u32;
            columns.push(column);
        }
        Ok(columns)
    }

    async fn get_foreign_key_relationships(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let sql = format!("PRAGMA foreign_key_list({})", quote_identifier(table, DatabaseType::SQLite));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(|e| driver_error(table, None, "fetch foreign keys", e))?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKey {
                source_column: row.get("from"),
                referenced_table: row.get("table"),
                referenced_column: row.get("to"),
            })
            .collect())
    }

    async fn get_column_constraints(&self, _table: &str) -> Result<HashMap<String, Constraints>> {
        // SQLite exposes no catalog view for CHECK constraint expressions
        // (short of re-parsing `sqlite_master.sql`, which isn't worth the
        // effort here); every column is unconstrained.
        Ok(HashMap::new())
    }

    async fn get_rows(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<IndexMap<String, String>>> {
        let quoted = quote_identifier(table, DatabaseType::SQLite);
        let sql = format!("SELECT * FROM {quoted} LIMIT {limit} OFFSET {offset}");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(|e| driver_error(table, None, "fetch rows", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record: IndexMap<String, String> = IndexMap::new();
            for column in row.columns() {
                let value: Option<String> = row.try_get_unchecked(column.ordinal()).unwrap_or(None);
                record.insert(column.name().to_string(), value.unwrap_or_default());
            }
            out.push(record);
        }
        Ok(out)
    }

    async fn add_row_returning_id(&self, table: &str, record: &[Record]) -> Result<i64> {
        let columns: Vec<&str> = record.iter().map(|r| r.column.as_str()).collect();
        let classes = column_type_classes(&columns, record);
        let quoted_table = quote_identifier(table, DatabaseType::SQLite);
        let quoted_columns: Vec<String> = columns.iter().map(|c| quote_identifier(c, DatabaseType::SQLite)).collect();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();

        let sql = format!("INSERT INTO {quoted_table} ({}) VALUES ({})", quoted_columns.join(", "), placeholders.join(", "));

        let mut query = sqlx::query(&sql);
        for (rec, class) in record.iter().zip(classes.iter()) {
            query = bind_record(query, rec, *class);
        }

        let auto_increment = self.auto_increment_column(table).await?;
        let mut guard = self.tx_conn.lock().await;
        let result = if let Some(conn) = guard.as_mut() {
            query.execute(&mut **conn).await
        } else {
            query.execute(&self.pool).await
        }
        .map_err(|e| driver_error(table, None, format!("insert failed: {}", truncate_sql(&sql, 200)), e))?;

        if auto_increment.is_some() {
            Ok(result.last_insert_rowid())
        } else {
            Ok(0)
        }
    }

    async fn bulk_add_rows(&self, table: &str, records: &[Vec<Record>]) -> Result<bool> {
        if records.is_empty() {
            return Ok(true);
        }
        let columns: Vec<&str> = records[0].iter().map(|r| r.column.as_str()).collect();
        let classes = column_type_classes(&columns, &records[0]);
        let quoted_table = quote_identifier(table, DatabaseType::SQLite);
        let quoted_columns: Vec<String> = columns.iter().map(|c| quote_identifier(c, DatabaseType::SQLite)).collect();

        for chunk in records.chunks(INSERT_BATCH_SIZE) {
            let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
            let all_placeholders = vec![row_placeholder; chunk.len()].join(", ");
            let sql = format!("INSERT INTO {quoted_table} ({}) VALUES {all_placeholders}", quoted_columns.join(", "));

            let mut query = sqlx::query(&sql);
            for row in chunk {
                for (idx, col) in columns.iter().enumerate() {
                    let rec = row.iter().find(|r| r.column == *col).expect("every row shares the same column set");
                    query = bind_record(query, rec, classes[idx]);
                }
            }
            self.execute(table, query).await?;
        }
        Ok(true)
    }

    async fn clear_table_data(&self, table: &str) -> Result<bool> {
        let quoted = quote_identifier(table, DatabaseType::SQLite);
        self.execute(table, sqlx::query(&format!("DELETE FROM {quoted}"))).await?;
        Ok(true)
    }

    async fn get_graph(&self) -> Result<Vec<GraphNode>> {
        let tables_query = "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'";
        let table_rows =
            sqlx::query(tables_query).fetch_all(&self.pool).await.map_err(|e| driver_error("(schema)", None, "fetch tables", e))?;
        let mut nodes: Vec<GraphNode> = table_rows.into_iter().map(|r| GraphNode { table: r.get("name"), children: Vec::new() }).collect();

        for node in nodes.clone() {
            let fks = self.get_foreign_key_relationships(&node.table).await.unwrap_or_default();
            for fk in fks {
                if let Some(parent) = nodes.iter_mut().find(|n| n.table == fk.referenced_table) {
                    if !parent.children.contains(&node.table) {
                        parent.children.push(node.table.clone());
                    }
                }
            }
        }
        Ok(nodes)
    }

    async fn begin_transaction(&self) -> Result<()> {
        let conn = self.pool.acquire().await.map_err(|e| driver_error("(session)", None, "failed to acquire connection", e))?;
        *self.tx_conn.lock().await = Some(conn);
        self.execute("(session)", sqlx::query("BEGIN")).await?;
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        self.execute("(session)", sqlx::query("COMMIT")).await?;
        *self.tx_conn.lock().await = None;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        self.execute("(session)", sqlx::query("ROLLBACK")).await?;
        *self.tx_conn.lock().await = None;
        Ok(())
    }
}
