//! FK Resolver: picks a parent row per referenced table, once per
//! generated row, so every column referencing the same parent table draws
//! from the same selected row — the invariant a composite foreign key needs.

use std::collections::HashMap;

use rand::Rng;

use crate::constants::NULLABLE_FK_PROBABILITY;
use crate::error::{Error, Result};
use crate::generate::pk::{PkRow, PkTracker};
use crate::generate::value::Value;
use crate::schema::types::ForeignKey;

/// Per-row cache of which parent row (if any) was selected for each
/// referenced table. Lives for the duration of a single row's generation,
/// then is discarded.
#[derive(Default)]
pub struct FkRowState {
    selected: HashMap<String, Option<PkRow>>,
}

impl FkRowState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolve the value for one FK column. `table_name` is the table currently
/// being generated (the child); `is_nullable` governs both the self-reference
/// and the missing-parent-row fallback.
pub fn resolve_fk_value(
    fk: &ForeignKey,
    table_name: &str,
    is_nullable: bool,
    state: &mut FkRowState,
    tracker: &PkTracker,
    rng: &mut impl Rng,
) -> Result<Value> {
    if fk.referenced_table == table_name {
        return if is_nullable {
            Ok(Value::Null)
        } else {
            Err(Error::NonNullableSelfReference {
                table: table_name.to_string(),
                column: fk.source_column.clone(),
            })
        };
    }

    if let Some(selected) = state.selected.get(&fk.referenced_table) {
        return Ok(match selected {
            None => Value::Null,
            Some(row) => row.get(&fk.referenced_column).cloned().unwrap_or(Value::Null),
        });
    }

    if is_nullable && rng.random_bool(NULLABLE_FK_PROBABILITY) {
        state.selected.insert(fk.referenced_table.clone(), None);
        return Ok(Value::Null);
    }

    match tracker.pick_random(&fk.referenced_table, rng) {
        Some(row) => {
            let value = row.get(&fk.referenced_column).cloned().unwrap_or(Value::Null);
            state.selected.insert(fk.referenced_table.clone(), Some(row.clone()));
            Ok(value)
        }
        None if is_nullable => {
            state.selected.insert(fk.referenced_table.clone(), None);
            Ok(Value::Null)
        }
        None => Err(Error::NoParentRows {
            table: table_name.to_string(),
            column: fk.source_column.clone(),
            parent_table: fk.referenced_table.clone(),
        }),
    }
}
