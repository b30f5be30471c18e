//! Dependency Analyzer: discovers every table reachable from the
//! target table via foreign keys, assigns each a row count from the density
//! ratio, and orders the whole set parents-first via a hand-rolled
//! topological sort (no graph crate: the analysis never needs more than
//! reachability plus Kahn's algorithm, so pulling in a dependency for it
//! would be pure ceremony).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::driver::{load_table, Driver};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct TableDependency {
    pub table: String,
    /// Parent tables this one has a foreign key into (self-references
    /// excluded — they never become a dependency edge).
    pub depends_on: Vec<String>,
    pub row_count: usize,
    /// `true` when the driver reports this table as not allowed to receive
    /// mock data; its existing rows are used as FK sources instead.
    pub is_blocked: bool,
}

pub struct DependencyAnalysis {
    /// Parents-first order: generating tables in this sequence always
    /// satisfies every foreign key before it is needed.
    pub order: Vec<TableDependency>,
    pub warnings: Vec<String>,
}

/// Walk the dependency closure of `target_table` and produce a parents-first
/// generation order. `row_count` is the number of rows requested for the
/// target; ancestors are sized by `max(1, child_rows / ratio)` at each edge.
pub async fn analyze_dependencies(
    driver: &dyn Driver,
    target_table: &str,
    row_count: usize,
    ratio: u32,
) -> Result<DependencyAnalysis> {
    let ratio = ratio.max(1) as usize;
    let mut assigned_rows: HashMap<String, usize> = HashMap::new();
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut blocked: HashMap<String, bool> = HashMap::new();
    let warnings: Vec<String> = Vec::new();

    // Breadth-first discovery. Traversal order doesn't affect the final
    // graph or row counts: each table's row count is fixed the first time
    // it's discovered, which for a DAG is unambiguous regardless of search
    // strategy.
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((target_table.to_string(), row_count.max(1)));

    while let Some((name, rows)) = queue.pop_front() {
        if assigned_rows.contains_key(&name) {
            continue;
        }
        assigned_rows.insert(name.clone(), rows);

        let table = load_table(driver, &name)
            .await
            .map_err(|e| Error::DependencyCollection { table: name.clone(), message: e.to_string() })?;
        if table.columns.is_empty() {
            return Err(Error::NoColumns { table: name.clone() });
        }

        let allowed = driver.is_mock_data_generation_allowed(&name).await.unwrap_or(true);
        blocked.insert(name.clone(), !allowed);

        let mut parents: Vec<String> = Vec::new();
        for fk in &table.foreign_keys {
            if fk.referenced_table == name {
                continue;
            }
            if !parents.contains(&fk.referenced_table) {
                parents.push(fk.referenced_table.clone());
            }
        }

        let parent_rows = (rows / ratio).max(1);
        for parent in &parents {
            queue.push_back((parent.clone(), parent_rows));
        }
        adjacency.insert(name, parents);
    }

    let order = topological_sort(&adjacency, &assigned_rows, &blocked)?;
    Ok(DependencyAnalysis { order, warnings })
}

fn topological_sort(
    adjacency: &HashMap<String, Vec<String>>,
    rows: &HashMap<String, usize>,
    blocked: &HashMap<String, bool>,
) -> Result<Vec<TableDependency>> {
    let nodes: Vec<String> = adjacency.keys().cloned().collect();

    // in_degree here counts *unresolved parents*; a node is ready once all
    // of its parents have been emitted.
    let mut in_degree: HashMap<String, usize> = nodes
        .iter()
        .map(|n| (n.clone(), adjacency.get(n).map(|parents| parents.len()).unwrap_or(0)))
        .collect();

    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    for (child, parents) in adjacency {
        for parent in parents {
            dependents.entry(parent.clone()).or_default().push(child.clone());
        }
    }

    let mut queue: VecDeque<String> = nodes
        .iter()
        .filter(|n| in_degree.get(*n).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    let mut emitted: Vec<String> = Vec::with_capacity(nodes.len());
    let mut emitted_set: HashSet<String> = HashSet::new();

    while let Some(node) = queue.pop_front() {
        emitted_set.insert(node.clone());
        emitted.push(node.clone());
        if let Some(children) = dependents.get(&node) {
            for child in children {
                let degree = in_degree.get_mut(child).expect("child present in in_degree map");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child.clone());
                }
            }
        }
    }

    if emitted.len() < nodes.len() {
        let mut remaining: Vec<String> = nodes.into_iter().filter(|n| !emitted_set.contains(n)).collect();
        remaining.sort();
        return Err(Error::Cycle { tables: remaining.join(" \u{2192} ") });
    }

    Ok(emitted
        .into_iter()
        .map(|name| TableDependency {
            depends_on: adjacency.get(&name).cloned().unwrap_or_default(),
            row_count: rows.get(&name).copied().unwrap_or(0),
            is_blocked: blocked.get(&name).copied().unwrap_or(false),
            table: name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockDriver;
    use crate::schema::types::{Column, DatabaseSchema, DatabaseType, ForeignKey, PrimaryKey, Table};

    fn table(name: &str) -> Table {
        Table::new(name)
    }

    fn pk_column() -> Column {
        let mut c = Column::new("id", "integer");
        c.is_primary = true;
        c.is_auto_increment = true;
        c.is_nullable = false;
        c
    }

    fn fk_column(name: &str, parent: &str) -> Column {
        let mut c = Column::new(name, "integer");
        c.is_foreign_key = true;
        c.is_nullable = false;
        c.referenced_table = Some(parent.to_string());
        c
    }

    #[tokio::test]
    async fn parent_child_pair_orders_parent_first() {
        let mut users = table("users");
        users.columns.insert("id".to_string(), pk_column());
        users.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

        let mut orders = table("orders");
        orders.columns.insert("id".to_string(), pk_column());
        orders.columns.insert("user_id".to_string(), fk_column("user_id", "users"));
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
        let analysis = analyze_dependencies(&driver, "orders", 100, 20).await.unwrap();

        let positions: HashMap<&str, usize> =
            analysis.order.iter().enumerate().map(|(i, d)| (d.table.as_str(), i)).collect();
        assert!(positions["users"] < positions["orders"]);

        let users_dep = analysis.order.iter().find(|d| d.table == "users").unwrap();
        assert_eq!(users_dep.row_count, 5);
        let orders_dep = analysis.order.iter().find(|d| d.table == "orders").unwrap();
        assert_eq!(orders_dep.row_count, 100);
    }

    #[tokio::test]
    async fn cycle_is_reported_as_structural_error() {
        let mut a = table("a");
        a.columns.insert("id".to_string(), pk_column());
        a.columns.insert("b_id".to_string(), fk_column("b_id", "b"));
        a.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
        a.foreign_keys.push(ForeignKey {
            source_column: "b_id".to_string(),
            referenced_table: "b".to_string(),
            referenced_column: "id".to_string(),
        });

        let mut b = table("b");
        b.columns.insert("id".to_string(), pk_column());
        b.columns.insert("a_id".to_string(), fk_column("a_id", "a"));
        b.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });
        b.foreign_keys.push(ForeignKey {
            source_column: "a_id".to_string(),
            referenced_table: "a".to_string(),
            referenced_column: "id".to_string(),
        });

        let mut schema = DatabaseSchema::new();
        schema.tables.insert("a".to_string(), a);
        schema.tables.insert("b".to_string(), b);

        let driver = MockDriver::new(schema, DatabaseType::PostgreSQL);
        let result = analyze_dependencies(&driver, "a", 10, 20).await;
        assert!(matches!(result, Err(Error::Cycle { .. })));
    }

    #[tokio::test]
    async fn blocked_table_is_flagged() {
        let mut users = table("users");
        users.columns.insert("id".to_string(), pk_column());
        users.primary_key = Some(PrimaryKey { columns: vec!["id".to_string()] });

        let mut schema = DatabaseSchema::new();
        schema.tables.insert("users".to_string(), users);

        let driver = MockDriver::new(schema, DatabaseType::PostgreSQL).with_blocked_table("users");
        let analysis = analyze_dependencies(&driver, "users", 10, 20).await.unwrap();
        assert!(analysis.order[0].is_blocked);
    }
}
