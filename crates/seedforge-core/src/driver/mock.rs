//! In-memory `Driver` used by the core crate's own integration tests.
//! Concrete backends live in `seedforge-drivers`; this one never touches a
//! real database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::driver::{Driver, GraphNode};
use crate::error::{Error, Result};
use crate::generate::value::Record;
use crate::schema::types::{Constraints, DatabaseSchema, DatabaseType};

type TableData = HashMap<String, Vec<IndexMap<String, String>>>;

struct Snapshot {
    data: TableData,
    next_id: HashMap<String, i64>,
}

pub struct MockDriver {
    db_type: DatabaseType,
    schema: DatabaseSchema,
    blocked: HashSet<String>,
    constraints: HashMap<String, HashMap<String, Constraints>>,
    fail_on_insert: Option<String>,
    data: Mutex<TableData>,
    next_id: Mutex<HashMap<String, i64>>,
    snapshot: Mutex<Option<Snapshot>>,
}

impl MockDriver {
    pub fn new(schema: DatabaseSchema, db_type: DatabaseType) -> Self {
        Self {
            db_type,
            schema,
            blocked: HashSet::new(),
            constraints: HashMap::new(),
            fail_on_insert: None,
            data: Mutex::new(HashMap::new()),
            next_id: Mutex::new(HashMap::new()),
            snapshot: Mutex::new(None),
        }
    }

    pub fn with_blocked_table(mut self, table: impl Into<String>) -> Self {
        self.blocked.insert(table.into());
        self
    }

    pub fn with_existing_rows(self, table: impl Into<String>, rows: Vec<IndexMap<String, String>>) -> Self {
        self.data.lock().unwrap().insert(table.into(), rows);
        self
    }

    pub fn with_column_constraints(mut self, table: impl Into<String>, column: impl Into<String>, constraints: Constraints) -> Self {
        self.constraints
            .entry(table.into())
            .or_default()
            .insert(column.into(), constraints);
        self
    }

    /// Make every insert against `table` fail, to exercise the rollback path:
    /// on any driver error, the run should roll back and propagate.
    pub fn with_insert_failure(mut self, table: impl Into<String>) -> Self {
        self.fail_on_insert = Some(table.into());
        self
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.data.lock().unwrap().get(table).map(|r| r.len()).unwrap_or(0)
    }

    fn should_fail(&self, table: &str) -> bool {
        self.fail_on_insert.as_deref() == Some(table)
    }

    fn record_to_row(records: &[Record]) -> IndexMap<String, String> {
        records.iter().map(|r| (r.column.clone(), r.value.clone())).collect()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn get_database_metadata(&self) -> Result<DatabaseType> {
        Ok(self.db_type)
    }

    async fn is_mock_data_generation_allowed(&self, table: &str) -> Result<bool> {
        Ok(!self.blocked.contains(table))
    }

    async fn get_columns_for_table(&self, table: &str) -> Result<Vec<crate::schema::types::Column>> {
        let t = self.schema.tables.get(table).ok_or_else(|| Error::Driver {
            table: table.to_string(),
            row_index: None,
            message: "unknown table".to_string(),
            source: None,
        })?;
        Ok(t.columns.values().cloned().collect())
    }

    async fn get_foreign_key_relationships(&self, table: &str) -> Result<Vec<crate::schema::types::ForeignKey>> {
        Ok(self.schema.tables.get(table).map(|t| t.foreign_keys.clone()).unwrap_or_default())
    }

    async fn get_column_constraints(&self, table: &str) -> Result<HashMap<String, Constraints>> {
        Ok(self.constraints.get(table).cloned().unwrap_or_default())
    }

    async fn get_rows(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<IndexMap<String, String>>> {
        let data = self.data.lock().unwrap();
        let rows = data.get(table).cloned().unwrap_or_default();
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn add_row_returning_id(&self, table: &str, record: &[Record]) -> Result<i64> {
        if self.should_fail(table) {
            return Err(Error::Driver {
                table: table.to_string(),
                row_index: None,
                message: "simulated insert failure".to_string(),
                source: None,
            });
        }

        let row = Self::record_to_row(record);
        let mut data = self.data.lock().unwrap();
        data.entry(table.to_string()).or_default().push(row);

        let has_auto_increment = self
            .schema
            .tables
            .get(table)
            .and_then(|t| t.auto_increment_column())
            .is_some();
        if !has_auto_increment {
            return Ok(0);
        }

        let mut next_id = self.next_id.lock().unwrap();
        let id = next_id.entry(table.to_string()).or_insert(0);
        *id += 1;
        Ok(*id)
    }

    async fn bulk_add_rows(&self, table: &str, records: &[Vec<Record>]) -> Result<bool> {
        if self.should_fail(table) {
            return Err(Error::Driver {
                table: table.to_string(),
                row_index: None,
                message: "simulated bulk insert failure".to_string(),
                source: None,
            });
        }

        let rows: Vec<IndexMap<String, String>> = records.iter().map(|r| Self::record_to_row(r)).collect();
        self.data.lock().unwrap().entry(table.to_string()).or_default().extend(rows);
        Ok(true)
    }

    async fn clear_table_data(&self, table: &str) -> Result<bool> {
        self.data.lock().unwrap().remove(table);
        self.next_id.lock().unwrap().remove(table);
        Ok(true)
    }

    async fn get_graph(&self) -> Result<Vec<GraphNode>> {
        let mut nodes: Vec<GraphNode> = self
            .schema
            .tables
            .keys()
            .map(|name| GraphNode { table: name.clone(), children: Vec::new() })
            .collect();

        for table in self.schema.tables.values() {
            for fk in &table.foreign_keys {
                if let Some(node) = nodes.iter_mut().find(|n| n.table == fk.referenced_table) {
                    if !node.children.contains(&table.name) {
                        node.children.push(table.name.clone());
                    }
                }
            }
        }
        Ok(nodes)
    }

    async fn begin_transaction(&self) -> Result<()> {
        let data = self.data.lock().unwrap().clone();
        let next_id = self.next_id.lock().unwrap().clone();
        *self.snapshot.lock().unwrap() = Some(Snapshot { data, next_id });
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        *self.snapshot.lock().unwrap() = None;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.lock().unwrap().take() {
            *self.data.lock().unwrap() = snapshot.data;
            *self.next_id.lock().unwrap() = snapshot.next_id;
        }
        Ok(())
    }
}
