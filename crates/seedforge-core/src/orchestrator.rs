//! Orchestrator: the single entry point that ties dependency
//! analysis, row generation, PK/uniqueness tracking, and transactional
//! commit/rollback together.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_FK_DENSITY_RATIO, MAX_EXISTING_PKS_TO_LOAD, MAX_PK_RETRIES};
use crate::driver::{load_table, Driver, GraphNode};
use crate::error::{Error, Result};
use crate::generate::pk::{PkRow, PkTracker};
use crate::generate::row::generate_row;
use crate::generate::value::{Record, Value};
use crate::graph::analyzer::{analyze_dependencies, TableDependency};
use crate::schema::types::Table;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub target_table: String,
    pub row_count: usize,
    /// When `true`, the target table's dependency-closure rows are cleared
    /// (FK-safely, children first) before generation.
    pub overwrite: bool,
    /// `parent_rows = max(1, child_rows / fk_density_ratio)`. `0` falls back
    /// to `DEFAULT_FK_DENSITY_RATIO`.
    pub fk_density_ratio: u32,
    pub seed: Option<u64>,
}

impl GenerateRequest {
    pub fn new(target_table: impl Into<String>, row_count: usize) -> Self {
        Self {
            target_table: target_table.into(),
            row_count,
            overwrite: false,
            fk_density_ratio: DEFAULT_FK_DENSITY_RATIO,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableResult {
    pub table: String,
    pub rows_generated: usize,
    pub used_existing_data: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub total_rows: usize,
    pub tables: Vec<TableResult>,
    pub warnings: Vec<String>,
}

/// Run a full generate cycle for `request` against `driver`:
///
/// 1. Reset tracker state.
/// 2. Analyze the dependency closure and compute a parents-first order.
/// 3. Optionally clear the closure FK-safely (overwrite mode).
/// 4. Begin a transaction.
/// 5. Walk the order: blocked tables contribute existing rows as FK sources;
///    everything else is generated, with the target table written in one
///    bulk call and every ancestor written row-by-row so its generated ID
///    (or natural key) becomes available to its children.
/// 6. Commit on success, roll back and propagate on any driver error.
pub async fn generate(driver: &dyn Driver, request: &GenerateRequest) -> Result<GenerationResult> {
    let mut tracker = PkTracker::new();
    tracker.reset();

    let ratio = if request.fk_density_ratio == 0 { DEFAULT_FK_DENSITY_RATIO } else { request.fk_density_ratio };

    let analysis = analyze_dependencies(driver, &request.target_table, request.row_count.max(1), ratio).await?;
    info!(target = %request.target_table, tables = analysis.order.len(), "dependency analysis complete");

    let mut warnings = analysis.warnings.clone();

    if request.overwrite {
        clear_dependency_closure(driver, &request.target_table, &mut tracker).await?;
    }

    driver.begin_transaction().await?;

    let seed = request.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    debug!(seed, "seeded RNG for this run");

    let mut results: Vec<TableResult> = Vec::with_capacity(analysis.order.len());

    for dep in &analysis.order {
        let is_target = dep.table == request.target_table;
        match generate_table(driver, dep, is_target, &mut rng, &mut tracker, request.overwrite, &mut warnings).await {
            Ok(result) => {
                info!(table = %dep.table, rows = result.rows_generated, "table generation complete");
                results.push(result);
            }
            Err(e) => {
                warn!(table = %dep.table, error = %e, "generation failed; rolling back");
                let _ = driver.rollback_transaction().await;
                return Err(e);
            }
        }
    }

    driver.commit_transaction().await?;

    let total_rows = results.iter().map(|r| r.rows_generated).sum();
    Ok(GenerationResult { total_rows, tables: results, warnings })
}

async fn generate_table(
    driver: &dyn Driver,
    dep: &TableDependency,
    is_target: bool,
    rng: &mut StdRng,
    tracker: &mut PkTracker,
    overwrite: bool,
    warnings: &mut Vec<String>,
) -> Result<TableResult> {
    let table = load_table(driver, &dep.table).await?;
    let constraints = driver.get_column_constraints(&dep.table).await?;

    if dep.is_blocked {
        let hit_budget = preload_existing_pks(driver, &table, true, tracker).await?;
        if hit_budget {
            warnings.push(format!(
                "existing-row preload for '{}' hit the {}-row cap; FK source diversity beyond that point is not guaranteed",
                dep.table, MAX_EXISTING_PKS_TO_LOAD
            ));
        }
        warnings.push(format!("table '{}' is blocked for mock-data generation; reused its existing rows as FK sources", dep.table));
        return Ok(TableResult { table: dep.table.clone(), rows_generated: 0, used_existing_data: true });
    }

    if !overwrite {
        let hit_budget = preload_existing_pks(driver, &table, false, tracker).await?;
        if hit_budget {
            warnings.push(format!(
                "existing-PK preload for '{}' hit the {}-row cap; uniqueness beyond that point is not guaranteed",
                dep.table, MAX_EXISTING_PKS_TO_LOAD
            ));
        }
    }

    if is_target {
        generate_target_bulk(driver, &table, &constraints, dep.row_count, rng, tracker, warnings).await
    } else {
        generate_parent_single(driver, &table, &constraints, dep.row_count, rng, tracker, warnings).await
    }
}

/// Whether `err` is a per-row policy failure that should be
/// counted and warned about rather than retried or propagated: retrying a
/// non-nullable self-reference can never succeed, and retrying an empty
/// parent set wastes the rest of the retry budget on an outcome that will
/// not change within this row's attempts.
fn is_row_policy_failure(err: &Error) -> bool {
    matches!(err, Error::NonNullableSelfReference { .. } | Error::NoParentRows { .. })
}

/// Target table: generate every row upfront, retrying PK
/// collisions up to `MAX_PK_RETRIES`, then write the whole batch in one
/// `BulkAddRows` call. Per-row failures reduce the emitted count; they never
/// abort the table.
async fn generate_target_bulk(
    driver: &dyn Driver,
    table: &Table,
    constraints_map: &std::collections::HashMap<String, crate::schema::types::Constraints>,
    row_count: usize,
    rng: &mut StdRng,
    tracker: &mut PkTracker,
    warnings: &mut Vec<String>,
) -> Result<TableResult> {
    let pk_columns = table.trackable_pk_columns();
    let mut batch: Vec<Vec<Record>> = Vec::with_capacity(row_count);
    let mut uniqueness_failures = 0usize;
    let mut policy_failures = 0usize;
    let mut empty_rows = 0usize;

    for row_index in 0..row_count {
        let mut accepted: Option<Vec<Record>> = None;
        let mut policy_break = false;

        for _ in 0..MAX_PK_RETRIES {
            match generate_row(table, constraints_map, rng, tracker) {
                Ok((values, records)) => {
                    let key = PkTracker::composite_key(&pk_columns, &values);
                    if tracker.is_used(&table.name, &key) {
                        continue;
                    }
                    tracker.mark_used(&table.name, key);
                    accepted = Some(records);
                    break;
                }
                Err(e) if is_row_policy_failure(&e) => {
                    warnings.push(format!("row {} for '{}' skipped: {}", row_index, table.name, e));
                    policy_failures += 1;
                    policy_break = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        match accepted {
            Some(records) if records.is_empty() => empty_rows += 1,
            Some(records) => batch.push(records),
            None if !policy_break && !pk_columns.is_empty() => uniqueness_failures += 1,
            None => {}
        }
    }

    if uniqueness_failures > 0 {
        warnings.push(format!(
            "{} row(s) for '{}' dropped: unique primary key retries exhausted after {} attempts",
            uniqueness_failures, table.name, MAX_PK_RETRIES
        ));
    }
    if policy_failures > 0 {
        warnings.push(format!("{} row(s) for '{}' dropped due to foreign-key policy failures", policy_failures, table.name));
    }
    if empty_rows > 0 {
        warnings.push(format!("{} row(s) for '{}' produced no columns (every column skipped)", empty_rows, table.name));
    }

    if batch.is_empty() {
        return Ok(TableResult { table: table.name.clone(), rows_generated: 0, used_existing_data: false });
    }

    let ok = driver.bulk_add_rows(&table.name, &batch).await.map_err(|e| Error::Driver {
        table: table.name.clone(),
        row_index: None,
        message: format!("bulk insert failed: {e}"),
        source: None,
    })?;
    if !ok {
        return Err(Error::Driver {
            table: table.name.clone(),
            row_index: None,
            message: "bulk insert returned failure".to_string(),
            source: None,
        });
    }

    Ok(TableResult { table: table.name.clone(), rows_generated: batch.len(), used_existing_data: false })
}

/// Parent tables: rows go in one at a
/// time so an auto-increment id returned by the driver can feed the PK
/// tracker before the next row is built, since auto-increment ids are only
/// known post-insert.
async fn generate_parent_single(
    driver: &dyn Driver,
    table: &Table,
    constraints_map: &std::collections::HashMap<String, crate::schema::types::Constraints>,
    row_count: usize,
    rng: &mut StdRng,
    tracker: &mut PkTracker,
    warnings: &mut Vec<String>,
) -> Result<TableResult> {
    let pk_columns = table.trackable_pk_columns();
    let auto_increment_column = table.auto_increment_column().map(|s| s.to_string());

    let mut inserted = 0usize;
    let mut uniqueness_failures = 0usize;
    let mut policy_failures = 0usize;
    let mut empty_rows = 0usize;

    for row_index in 0..row_count {
        let mut accepted: Option<(PkRow, Vec<Record>, Option<String>)> = None;
        let mut policy_break = false;

        for _ in 0..MAX_PK_RETRIES {
            match generate_row(table, constraints_map, rng, tracker) {
                Ok((values, records)) => {
                    // Auto-increment PKs are the database's uniqueness problem;
                    // no retry is attempted for them.
                    if auto_increment_column.is_some() {
                        accepted = Some((values, records, None));
                        break;
                    }
                    let key = PkTracker::composite_key(&pk_columns, &values);
                    if tracker.is_used(&table.name, &key) {
                        continue;
                    }
                    accepted = Some((values, records, Some(key)));
                    break;
                }
                Err(e) if is_row_policy_failure(&e) => {
                    warnings.push(format!("row {} for '{}' skipped: {}", row_index, table.name, e));
                    policy_failures += 1;
                    policy_break = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let Some((mut values, records, key)) = accepted else {
            if !policy_break && auto_increment_column.is_none() && !pk_columns.is_empty() {
                uniqueness_failures += 1;
            }
            continue;
        };
        if records.is_empty() {
            // Every column in this row was skipped (auto-increment/computed
            // only); there is nothing for the driver to insert.
            empty_rows += 1;
            continue;
        }

        let id = driver.add_row_returning_id(&table.name, &records).await.map_err(|e| Error::Driver {
            table: table.name.clone(),
            row_index: Some(row_index),
            message: format!("single-row insert failed: {e}"),
            source: None,
        })?;

        if let Some(col) = &auto_increment_column {
            values.insert(col.clone(), Value::Int(id));
        } else if let Some(key) = key {
            tracker.mark_used(&table.name, key);
        }
        tracker.record_generated(&table.name, values);
        inserted += 1;

        if row_count >= 100 && (row_index + 1) % 100 == 0 {
            debug!(table = %table.name, rows = row_index + 1, total = row_count, "generation progress");
        }
    }

    if uniqueness_failures > 0 {
        warnings.push(format!(
            "{} row(s) for '{}' dropped: unique primary key retries exhausted after {} attempts",
            uniqueness_failures, table.name, MAX_PK_RETRIES
        ));
    }
    if policy_failures > 0 {
        warnings.push(format!("{} row(s) for '{}' dropped due to foreign-key policy failures", policy_failures, table.name));
    }
    if empty_rows > 0 {
        warnings.push(format!("{} row(s) for '{}' produced no columns (every column skipped)", empty_rows, table.name));
    }

    Ok(TableResult { table: table.name.clone(), rows_generated: inserted, used_existing_data: false })
}

/// Preload existing rows for `table`, marking their composite-key strings
/// used and, for blocked tables, keeping
/// the full row around as an FK source. Returns whether the load hit the cap.
async fn preload_existing_pks(driver: &dyn Driver, table: &Table, keep_full_rows: bool, tracker: &mut PkTracker) -> Result<bool> {
    let rows = driver.get_rows(&table.name, MAX_EXISTING_PKS_TO_LOAD, 0).await?;
    let hit_budget = rows.len() >= MAX_EXISTING_PKS_TO_LOAD;
    let pk_columns = table.trackable_pk_columns();

    for raw_row in rows {
        let pk_row: PkRow = raw_row.into_iter().map(|(k, v)| (k, crate::generate::value::owned(v))).collect();

        if !pk_columns.is_empty() {
            let key = PkTracker::composite_key(&pk_columns, &pk_row);
            tracker.mark_used(&table.name, key);
        }
        if keep_full_rows {
            tracker.record_existing(&table.name, pk_row);
        }
    }

    Ok(hit_budget)
}

/// FK-safe cascading clear: clear children before the table they
/// reference, breaking ties via the driver's own graph. Falls back to
/// clearing just the target when the driver cannot supply a graph.
async fn clear_dependency_closure(driver: &dyn Driver, target: &str, tracker: &mut PkTracker) -> Result<()> {
    let nodes = match driver.get_graph().await {
        Ok(n) => n,
        Err(_) => {
            driver.clear_table_data(target).await?;
            tracker.clear_used(target);
            return Ok(());
        }
    };

    let child_map: std::collections::HashMap<String, Vec<String>> =
        nodes.into_iter().map(|GraphNode { table, children }| (table, children)).collect();

    let mut order: Vec<String> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    visit_post_order(target, &child_map, &mut seen, &mut order);

    for table in &order {
        driver.clear_table_data(table).await?;
        tracker.clear_used(table);
    }
    Ok(())
}

/// Plain synchronous recursion (no `Driver` calls here) so it never runs
/// into the lifetime friction of recursive `async fn`s holding shared
/// mutable state. Produces children-before-parent ("clear this before its
/// referencing tables exist") order; cycles are broken by `seen`.
fn visit_post_order(
    table: &str,
    child_map: &std::collections::HashMap<String, Vec<String>>,
    seen: &mut std::collections::HashSet<String>,
    order: &mut Vec<String>,
) {
    if seen.contains(table) {
        return;
    }
    seen.insert(table.to_string());
    if let Some(children) = child_map.get(table) {
        for child in children {
            visit_post_order(child, child_map, seen, order);
        }
    }
    order.push(table.to_string());
}
