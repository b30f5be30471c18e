//! # Error Types
//!
//! `Error` is the single error enum for every failure mode the generation
//! core can produce, grouped along the five kinds the design calls for:
//! structural (graph-level), policy (no valid value producible), uniqueness
//! (PK retries exhausted), driver (pass-through of a backend failure), and
//! the budget warning emitted when PK preloading hits its cap. Only the
//! first four are represented as `Error` variants — a budget overrun is not
//! fatal, so it is pushed onto `GenerationResult::warnings` instead (see
//! `orchestrator`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("circular dependency detected involving tables: {tables}")]
    Cycle { tables: String },

    #[error("failed to collect dependencies for table '{table}': {message}")]
    DependencyCollection { table: String, message: String },

    #[error("table '{table}' has no columns")]
    NoColumns { table: String },

    #[error("cannot generate valid data for {table}.{column}: non-nullable self-referencing foreign key")]
    NonNullableSelfReference { table: String, column: String },

    #[error("no parent rows available for {table}.{column} -> {parent_table}")]
    NoParentRows {
        table: String,
        column: String,
        parent_table: String,
    },

    #[error("unique primary key retries exhausted for {table} at row {row_index} after {max_retries} attempts")]
    UniquenessExhausted {
        table: String,
        row_index: usize,
        max_retries: usize,
    },

    #[error("driver operation failed on {table} (row {row_index:?}): {message}")]
    Driver {
        table: String,
        row_index: Option<usize>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
