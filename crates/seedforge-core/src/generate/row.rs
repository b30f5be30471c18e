//! Row Builder: walks a table's columns in order, skipping the ones
//! the driver owns (auto-increment, computed), and produces one `Record` per
//! remaining column by delegating to the FK resolver, the name matcher, or
//! the value generator.

use std::collections::HashMap;

use rand::Rng;

use crate::constants::REGULAR_NULL_PROBABILITY;
use crate::error::Result;
use crate::generate::fk::{resolve_fk_value, FkRowState};
use crate::generate::pk::{PkRow, PkTracker};
use crate::generate::providers::{generate_json_value, generate_value};
use crate::generate::value::{Record, Value};
use crate::schema::types::{normalize_type, ConstraintValue, Constraints, Table, TypeClass};

/// Table + column name lookups against the constraints map are
/// case-insensitive because the originating catalogs don't agree on casing
/// for quoted identifiers.
fn lookup_constraints<'a>(map: &'a HashMap<String, Constraints>, column: &str) -> Option<&'a Constraints> {
    map.get(column)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(column)).map(|(_, v)| v))
}

/// Generate one row. Returns the typed column values (for PK tracking and as
/// an FK source for children) alongside the `Record`s the driver will write.
/// An empty `Vec<Record>` means every column in the table was skipped
/// (auto-increment/computed only) — callers should treat that as a warning,
/// not an error.
pub fn generate_row(
    table: &Table,
    constraints_map: &HashMap<String, Constraints>,
    rng: &mut impl Rng,
    tracker: &PkTracker,
) -> Result<(PkRow, Vec<Record>)> {
    let mut values: PkRow = PkRow::new();
    let mut records: Vec<Record> = Vec::with_capacity(table.columns.len());
    let mut fk_state = FkRowState::new();

    for column in table.columns.values() {
        if column.is_auto_increment || column.is_computed {
            continue;
        }

        let constraints = lookup_constraints(constraints_map, &column.name);

        let value = if column.is_foreign_key {
            match table.foreign_keys.iter().find(|fk| fk.source_column == column.name) {
                Some(fk) => resolve_fk_value(fk, &table.name, column.is_nullable, &mut fk_state, tracker, rng)?,
                // Column is flagged as a foreign key but no relationship was
                // returned for it; fall back to ordinary value generation
                // rather than failing the whole row.
                None => generate_non_fk_value(&column.name, column.is_nullable, column.length, &column.raw_type, constraints, rng),
            }
        } else {
            generate_non_fk_value(&column.name, column.is_nullable, column.length, &column.raw_type, constraints, rng)
        };

        // A NULL value is dropped rather than emitted, letting the database
        // apply its own default: the column is simply absent from the
        // record, rather than sent as an explicit NULL.
        if !value.is_null() {
            let type_hint = constraints
                .and_then(|c| c.type_hint())
                .map(|s| s.to_string())
                .unwrap_or_else(|| column.raw_type.clone());
            records.push(Record::new(&column.name, &value, type_hint));
        }
        values.insert(column.name.clone(), value);
    }

    Ok((values, records))
}

fn generate_non_fk_value(
    column_name: &str,
    is_nullable: bool,
    length: Option<u32>,
    raw_type: &str,
    constraints: Option<&Constraints>,
    rng: &mut impl Rng,
) -> Value {
    if is_nullable && rng.random_bool(REGULAR_NULL_PROBABILITY) {
        return Value::Null;
    }

    if constraints.map(|c| c.is_json()).unwrap_or(false) {
        return generate_json_value(rng);
    }

    let normalized = normalize_type(raw_type);

    let mut merged = constraints.cloned().unwrap_or_default();
    if merged.length().is_none() {
        if let Some(len) = length {
            merged.0.insert("length".to_string(), ConstraintValue::Int(len as i64));
        }
    }

    // The name matcher only applies to free-form text columns with no fixed
    // enumeration; CHECK-constrained or coded columns defer to the value
    // generator so the constraint is honored.
    if matches!(normalized.class, TypeClass::Text) && !normalized.is_array && merged.check_values().is_none() {
        if let Some(v) = crate::classify::match_column_name(column_name, merged.length(), rng) {
            return v;
        }
    }

    generate_value(&normalized, &merged, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Column;
    use rand::SeedableRng;

    fn simple_table() -> Table {
        let mut t = Table::new("widgets");
        let mut id = Column::new("id", "integer");
        id.is_primary = true;
        id.is_auto_increment = true;
        id.is_nullable = false;
        t.columns.insert("id".to_string(), id);

        let mut name = Column::new("name", "varchar(50)");
        name.is_nullable = false;
        name.length = Some(50);
        t.columns.insert("name".to_string(), name);

        let mut note = Column::new("note", "text");
        note.is_nullable = true;
        t.columns.insert("note".to_string(), note);

        t
    }

    #[test]
    fn auto_increment_column_is_skipped() {
        let table = simple_table();
        let constraints = HashMap::new();
        let tracker = PkTracker::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let (values, records) = generate_row(&table, &constraints, &mut rng, &tracker).unwrap();
        assert!(!values.contains_key("id"));
        assert!(!records.iter().any(|r| r.column == "id"));
    }

    #[test]
    fn non_nullable_column_is_never_null() {
        let table = simple_table();
        let constraints = HashMap::new();
        let tracker = PkTracker::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let (values, _) = generate_row(&table, &constraints, &mut rng, &tracker).unwrap();
            assert!(!matches!(values.get("name"), Some(Value::Null)));
        }
    }

    #[test]
    fn record_presence_matches_nullness() {
        let table = simple_table();
        let constraints = HashMap::new();
        let tracker = PkTracker::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let (values, records) = generate_row(&table, &constraints, &mut rng, &tracker).unwrap();

        assert!(records.iter().any(|r| r.column == "name"));
        for (column, value) in &values {
            let has_record = records.iter().any(|r| &r.column == column);
            assert_eq!(has_record, !value.is_null(), "column '{column}' record presence must match its nullness");
        }
    }

    #[test]
    fn nullable_column_is_sometimes_dropped_from_the_record() {
        let table = simple_table();
        let constraints = HashMap::new();
        let tracker = PkTracker::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let mut saw_note_dropped = false;
        for _ in 0..200 {
            let (_, records) = generate_row(&table, &constraints, &mut rng, &tracker).unwrap();
            if !records.iter().any(|r| r.column == "note") {
                saw_note_dropped = true;
                break;
            }
        }
        assert!(saw_note_dropped, "a nullable column should be dropped from the record at least once in 200 rows");
    }
}
