//! Tunable constants exposed by the core's public surface.

/// `parent_rows = max(1, child_rows / ratio)` when no override is given.
pub const DEFAULT_FK_DENSITY_RATIO: u32 = 20;

/// Probability a nullable FK column is resolved to NULL instead of a parent row.
pub const NULLABLE_FK_PROBABILITY: f64 = 0.2;

/// Probability a nullable non-FK column is emitted as NULL.
pub const REGULAR_NULL_PROBABILITY: f64 = 0.1;

/// Bound on PK-uniqueness collision retries per row.
pub const MAX_PK_RETRIES: usize = 100;

/// Bound on existing-PK rows scanned for uniqueness/FK-source preloading.
pub const MAX_EXISTING_PKS_TO_LOAD: usize = 10_000;
