//! PK Tracker and Uniqueness Guard: tracks generated and
//! preloaded parent rows for FK resolution, plus the set of composite-key
//! strings already used per table.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use rand::Rng;

use crate::generate::value::Value;

/// A single row's worth of typed column values, keyed by column name.
/// Used both for generated rows (full column set or just PK columns,
/// depending on caller) and preloaded existing rows.
pub type PkRow = IndexMap<String, Value>;

/// Tracks, per table: rows available as FK sources (generated this run plus
/// preloaded existing rows) and which composite-key strings are already
/// spoken for.
#[derive(Default)]
pub struct PkTracker {
    generated: HashMap<String, Vec<PkRow>>,
    existing: HashMap<String, Vec<PkRow>>,
    used_keys: HashMap<String, HashSet<String>>,
}

impl PkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all per-run state.
    pub fn reset(&mut self) {
        self.generated.clear();
        self.existing.clear();
        self.used_keys.clear();
    }

    /// Drop the used-key set for one table, e.g. after it has been cleared
    /// during an overwrite.
    pub fn clear_used(&mut self, table: &str) {
        self.used_keys.remove(table);
        self.generated.remove(table);
        self.existing.remove(table);
    }

    /// Join `"col=value"` pairs with `|`. An empty `pk_columns` slice (no
    /// trackable PK) yields an empty string, which callers treat as "do not
    /// track" (open question: no-trackable-PK tables skip uniqueness
    /// tracking entirely rather than erroring).
    pub fn composite_key(pk_columns: &[&str], row: &PkRow) -> String {
        if pk_columns.is_empty() {
            return String::new();
        }
        pk_columns
            .iter()
            .map(|col| {
                let value = row.get(*col).map(|v| v.to_unique_key()).unwrap_or_default();
                format!("{}={}", col, value)
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn is_used(&self, table: &str, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        self.used_keys.get(table).map(|s| s.contains(key)).unwrap_or(false)
    }

    pub fn mark_used(&mut self, table: &str, key: String) {
        if key.is_empty() {
            return;
        }
        self.used_keys.entry(table.to_string()).or_default().insert(key);
    }

    pub fn record_generated(&mut self, table: &str, row: PkRow) {
        self.generated.entry(table.to_string()).or_default().push(row);
    }

    pub fn record_existing(&mut self, table: &str, row: PkRow) {
        self.existing.entry(table.to_string()).or_default().push(row);
    }

    /// Uniformly pick a row from the union of generated and preloaded rows
    /// for `table`.
    pub fn pick_random(&self, table: &str, rng: &mut impl Rng) -> Option<&PkRow> {
        let generated = self.generated.get(table).map(|v| v.as_slice()).unwrap_or(&[]);
        let existing = self.existing.get(table).map(|v| v.as_slice()).unwrap_or(&[]);
        let total = generated.len() + existing.len();
        if total == 0 {
            return None;
        }
        let idx = rng.random_range(0..total);
        if idx < generated.len() {
            Some(&generated[idx])
        } else {
            Some(&existing[idx - generated.len()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn empty_pk_columns_produce_empty_key_and_are_never_used() {
        let row: PkRow = IndexMap::new();
        let key = PkTracker::composite_key(&[], &row);
        assert_eq!(key, "");
        let tracker = PkTracker::new();
        assert!(!tracker.is_used("t", &key));
    }

    #[test]
    fn composite_key_joins_columns_in_order() {
        let mut row: PkRow = IndexMap::new();
        row.insert("region_id".to_string(), Value::Int(1));
        row.insert("city_id".to_string(), Value::Int(2));
        let key = PkTracker::composite_key(&["region_id", "city_id"], &row);
        assert_eq!(key, "region_id=1|city_id=2");
    }

    #[test]
    fn mark_used_is_idempotent_and_respected_by_is_used() {
        let mut tracker = PkTracker::new();
        tracker.mark_used("t", "id=1".to_string());
        assert!(tracker.is_used("t", "id=1"));
        assert!(!tracker.is_used("t", "id=2"));
        tracker.mark_used("t", "id=1".to_string());
        assert!(tracker.is_used("t", "id=1"));
    }

    #[test]
    fn pick_random_draws_from_generated_and_existing() {
        let mut tracker = PkTracker::new();
        let mut a: PkRow = IndexMap::new();
        a.insert("id".to_string(), Value::Int(1));
        tracker.record_generated("t", a);
        let mut b: PkRow = IndexMap::new();
        b.insert("id".to_string(), Value::Int(2));
        tracker.record_existing("t", b);

        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            if let Some(row) = tracker.pick_random("t", &mut rng) {
                if let Some(Value::Int(i)) = row.get("id") {
                    seen.insert(*i);
                }
            }
        }
        assert!(seen.contains(&1) && seen.contains(&2));
    }

    #[test]
    fn pick_random_returns_none_when_empty() {
        let tracker = PkTracker::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(tracker.pick_random("nope", &mut rng).is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = PkTracker::new();
        tracker.mark_used("t", "id=1".to_string());
        tracker.record_generated("t", IndexMap::new());
        tracker.reset();
        assert!(!tracker.is_used("t", "id=1"));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(tracker.pick_random("t", &mut rng).is_none());
    }
}
