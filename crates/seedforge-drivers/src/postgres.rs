//! Postgres `Driver`: `information_schema` + `pg_catalog` introspection,
//! batched bind-parameter inserts, and a dedicated per-driver connection used
//! only while a transaction is open.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, PgPool, Postgres, Row};
use tokio::sync::Mutex;

use seedforge_core::driver::GraphNode;
use seedforge_core::error::Result;
use seedforge_core::generate::value::Record;
use seedforge_core::schema::types::{normalize_type, Column, ConstraintValue, Constraints, DatabaseType, ForeignKey, TypeClass};
use seedforge_core::Driver;

use crate::support::{driver_error, quote_identifier, sanitize_url, truncate_sql, INSERT_BATCH_SIZE};

pub struct PostgresDriver {
    pool: PgPool,
    schema_name: String,
    blocked: HashSet<String>,
    tx_conn: Mutex<Option<PoolConnection<Postgres>>>,
}

impl PostgresDriver {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(db_url).await.map_err(|e| {
            driver_error("(connect)", None, format!("failed to connect to {}", sanitize_url(db_url)), e)
        })?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, schema_name: "public".to_string(), blocked: HashSet::new(), tx_conn: Mutex::new(None) }
    }

    pub fn with_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    pub fn with_blocked_tables(mut self, tables: impl IntoIterator<Item = String>) -> Self {
        self.blocked.extend(tables);
        self
    }

    async fn execute(&self, table: &str, query: Query<'_, Postgres, PgArguments>) -> Result<u64> {
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

/// Bind `record.value` as the Rust type its column class calls for, so the
/// placeholder carries a real typed parameter instead of a string literal,
/// keeping generated values out of the SQL text entirely.
fn bind_record<'q>(query: Query<'q, Postgres, PgArguments>, record: &Record, class: TypeClass) -> Query<'q, Postgres, PgArguments> {
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

/// Cast appended to a bind placeholder for column classes Postgres cannot
/// infer a parameter type for on its own (`$1::uuid`, `$1::jsonb`, ...).
/// Primitives bound as their native Rust type need no cast.
fn pg_cast_suffix(class: TypeClass) -> &'static str {
    match class {
        TypeClass::Date => "::date",
        TypeClass::DateTime => "::timestamptz",
        TypeClass::Uuid => "::uuid",
        TypeClass::Json => "::jsonb",
        _ => "",
    }
}

fn column_type_classes(columns: &[&str], records: &[Record]) -> Vec<TypeClass> {
    columns
        .iter()
        .map(|name| records.iter().find(|r| r.column == *name).map(|r| normalize_type(&r.meta.r#type).class).unwrap_or(TypeClass::Text))
        .collect()
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn get_database_metadata(&self) -> Result<DatabaseType> {
        Ok(DatabaseType::PostgreSQL)
    }

    async fn is_mock_data_generation_allowed(&self, table: &str) -> Result<bool> {
        Ok(!self.blocked.contains(table))
    }

    async fn get_columns_for_table(&self, table: &str) -> Result<Vec<Column>> {
        let query = r#"
            SELECT column_name, data_type, udt_name, is_nullable, column_default, is_generated,
                   character_maximum_length, numeric_precision, numeric_scale, ordinal_position
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error(table, None, "fetch columns", e))?;

        let pk_query = r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = $1 AND tc.table_name = $2 AND tc.constraint_type = 'PRIMARY KEY'
        "#;
        let pk_rows = sqlx::query(pk_query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error(table, None, "fetch primary key", e))?;
        let pk_columns: HashSet<String> = pk_rows.iter().map(|r| r.get::<String, _>("column_name")).collect();

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let udt_name: String = row.get("udt_name");
            let is_nullable: String = row.get("is_nullable");
            let column_default: Option<String> = row.get("column_default");
            let is_generated: String = row.get("is_generated");
            let max_length: Option<i32> = row.get("character_maximum_length");
            let numeric_precision: Option<i32> = row.get("numeric_precision");
            let numeric_scale: Option<i32> = row.get("numeric_scale");
            let ordinal_position: i32 = row.get("ordinal_position");

            // Postgres reports array columns as data_type "ARRAY" with the
            // element type underscore-prefixed in udt_name.
            let raw_type = if data_type == "ARRAY" {
                format!("{}[]", udt_name.trim_start_matches('_'))
            } else if data_type == "USER-DEFINED" {
                udt_name.clone()
            } else {
                data_type.clone()
            };

            let mut column = Column::new(&name, raw_type);
            column.is_nullable = is_nullable == "YES";
            column.is_auto_increment = column_default.as_deref().map(|d| d.starts_with("nextval(")).unwrap_or(false);
            column.is_computed = is_generated == "ALWAYS";
            column.is_primary = pk_columns.contains(&name);
            column.length = max_length.map(|v| v as u32);
            column.precision = numeric_precision.map(|v| v as i64);
            column.scale = numeric_scale.map(|v| v as i64);
            column.ordinal_position = ordinal_position as u32;
            columns.push(column);
        }
        Ok(columns)
    }

    async fn get_foreign_key_relationships(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let query = r#"
            SELECT kcu.column_name, ccu.table_name AS referenced_table_name, ccu.column_name AS referenced_column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema
            WHERE tc.table_schema = $1 AND tc.table_name = $2 AND tc.constraint_type = 'FOREIGN KEY'
            ORDER BY kcu.ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error(table, None, "fetch foreign keys", e))?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKey {
                source_column: row.get("column_name"),
                referenced_table: row.get("referenced_table_name"),
                referenced_column: row.get("referenced_column_name"),
            })
            .collect())
    }

    async fn get_column_constraints(&self, table: &str) -> Result<HashMap<String, Constraints>> {
        let mut out: HashMap<String, Constraints> = HashMap::new();

        let check_query = r#"
            SELECT cc.check_clause
            FROM information_schema.table_constraints tc
            JOIN information_schema.check_constraints cc
                ON tc.constraint_name = cc.constraint_name AND tc.constraint_schema = cc.constraint_schema
            WHERE tc.table_schema = $1 AND tc.table_name = $2 AND tc.constraint_type = 'CHECK'
        "#;
        let check_rows = sqlx::query(check_query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error(table, None, "fetch check constraints", e))?;
        for row in check_rows {
            let clause: String = row.get("check_clause");
            if let Some((column, value, kind)) = parse_numeric_check(&clause) {
                let entry = out.entry(column).or_default();
                match kind {
                    CheckKind::Min => entry.0.insert("check_min".to_string(), ConstraintValue::Float(value)),
                    CheckKind::Max => entry.0.insert("check_max".to_string(), ConstraintValue::Float(value)),
                };
            }
        }

        // Enum-typed columns: fold the pg_enum label set into check_values so
        // the value generator treats them the same as a CHECK ... IN (...) list.
        let enum_query = r#"
            SELECT c.column_name, e.enumlabel
            FROM information_schema.columns c
            JOIN pg_type t ON t.typname = c.udt_name
            JOIN pg_enum e ON e.enumtypid = t.oid
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.column_name, e.enumsortorder
        "#;
        let enum_rows = sqlx::query(enum_query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error(table, None, "fetch enum labels", e))?;
        let mut enum_values: HashMap<String, Vec<String>> = HashMap::new();
        for row in enum_rows {
            let column_name: String = row.get("column_name");
            let label: String = row.get("enumlabel");
            enum_values.entry(column_name).or_default().push(label);
        }
        for (column, values) in enum_values {
            out.entry(column).or_default().0.insert("check_values".to_string(), ConstraintValue::StringList(values));
        }

        Ok(out)
    }

    async fn get_rows(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<IndexMap<String, String>>> {
        let quoted = quote_identifier(table, DatabaseType::PostgreSQL);
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
        let quoted_table = quote_identifier(table, DatabaseType::PostgreSQL);
        let quoted_columns: Vec<String> = columns.iter().map(|c| quote_identifier(c, DatabaseType::PostgreSQL)).collect();
        let placeholders: Vec<String> = classes.iter().enumerate().map(|(i, class)| format!("${}{}", i + 1, pg_cast_suffix(*class))).collect();

        let auto_increment = self.auto_increment_column(table).await?;
        let returning = auto_increment.as_ref().map(|c| format!(" RETURNING {}", quote_identifier(c, DatabaseType::PostgreSQL))).unwrap_or_default();

        let sql = format!(
            "INSERT INTO {quoted_table} ({}) VALUES ({}){returning}",
            quoted_columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (rec, class) in record.iter().zip(classes.iter()) {
            query = bind_record(query, rec, *class);
        }

        if let Some(_col) = &auto_increment {
            let mut guard = self.tx_conn.lock().await;
            let row = if let Some(conn) = guard.as_mut() {
                query.fetch_one(&mut **conn).await
            } else {
                query.fetch_one(&self.pool).await
            }
            .map_err(|e| driver_error(table, None, format!("insert failed: {}", truncate_sql(&sql, 200)), e))?;
            let id: i64 = row.try_get(0).unwrap_or(0);
            Ok(id)
        } else {
            self.execute(table, query).await?;
            Ok(0)
        }
    }

    async fn bulk_add_rows(&self, table: &str, records: &[Vec<Record>]) -> Result<bool> {
        if records.is_empty() {
            return Ok(true);
        }
        let columns: Vec<&str> = records[0].iter().map(|r| r.column.as_str()).collect();
        let classes = column_type_classes(&columns, &records[0]);
        let quoted_table = quote_identifier(table, DatabaseType::PostgreSQL);
        let quoted_columns: Vec<String> = columns.iter().map(|c| quote_identifier(c, DatabaseType::PostgreSQL)).collect();

        for chunk in records.chunks(INSERT_BATCH_SIZE) {
            let mut sql = format!("INSERT INTO {quoted_table} ({}) VALUES ", quoted_columns.join(", "));
            let mut placeholder = 1usize;
            for (i, _row) in chunk.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('(');
                for (j, class) in classes.iter().enumerate() {
                    if j > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str(&format!("${placeholder}{}", pg_cast_suffix(*class)));
                    placeholder += 1;
                }
                sql.push(')');
            }

            let mut query = sqlx::query(&sql);
            for row in chunk {
                for col in &columns {
                    let idx = columns.iter().position(|c| c == col).expect("column is in its own list");
                    let rec = row.iter().find(|r| r.column == *col).expect("every row shares the same column set");
                    query = bind_record(query, rec, classes[idx]);
                }
            }

            self.execute(table, query).await?;
        }
        Ok(true)
    }

    async fn clear_table_data(&self, table: &str) -> Result<bool> {
        let quoted = quote_identifier(table, DatabaseType::PostgreSQL);
        let sql = format!("TRUNCATE TABLE {quoted} RESTART IDENTITY CASCADE");
        self.execute(table, sqlx::query(&sql)).await?;
        Ok(true)
    }

    async fn get_graph(&self) -> Result<Vec<GraphNode>> {
        let tables_query = "SELECT table_name FROM information_schema.tables WHERE table_schema = $1 AND table_type = 'BASE TABLE'";
        let table_rows = sqlx::query(tables_query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error("(schema)", None, "fetch tables", e))?;
        let mut nodes: Vec<GraphNode> =
            table_rows.into_iter().map(|r| GraphNode { table: r.get("table_name"), children: Vec::new() }).collect();

        let fk_query = r#"
            SELECT tc.table_name, ccu.table_name AS referenced_table_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema
            WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY'
        "#;
        let fk_rows = sqlx::query(fk_query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error("(schema)", None, "fetch foreign keys", e))?;
        for row in fk_rows {
            let child: String = row.get("table_name");
            let parent: String = row.get("referenced_table_name");
            if let Some(node) = nodes.iter_mut().find(|n| n.table == parent) {
                if !node.children.contains(&child) {
                    node.children.push(child);
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

enum CheckKind {
    Min,
    Max,
}

/// Parse the handful of numeric CHECK shapes common enough to be worth
/// mapping onto `check_min`/`check_max`. Anything more exotic is left
/// unparsed rather than guessed at.
fn parse_numeric_check(expr: &str) -> Option<(String, f64, CheckKind)> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(expr).trim();

    let patterns: [(&str, CheckKind); 4] = [
        (r"^(\w+)\s*>=\s*(-?[\d.]+)$", CheckKind::Min),
        (r"^(\w+)\s*>\s*(-?[\d.]+)$", CheckKind::Min),
        (r"^(\w+)\s*<=\s*(-?[\d.]+)$", CheckKind::Max),
        (r"^(\w+)\s*<\s*(-?[\d.]+)$", CheckKind::Max),
    ];
    for (pattern, kind) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            if let Some(caps) = re.captures(expr) {
                let column = caps[1].to_string();
                let value: f64 = caps[2].parse().ok()?;
                return Some((column, value, kind));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ge_and_le_numeric_checks() {
        let (col, val, kind) = parse_numeric_check("(price >= 0)").unwrap();
        assert_eq!(col, "price");
        assert_eq!(val, 0.0);
        assert!(matches!(kind, CheckKind::Min));

        let (col, val, kind) = parse_numeric_check("quantity <= 100").unwrap();
        assert_eq!(col, "quantity");
        assert_eq!(val, 100.0);
        assert!(matches!(kind, CheckKind::Max));
    }

    #[test]
    fn non_numeric_check_clauses_are_left_unparsed() {
        assert!(parse_numeric_check("status IN ('a', 'b')").is_none());
    }
}
