//! Generated-value representation and the Record that crosses the boundary
//! into a driver.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A single generated value, still in typed form.
///
/// `String` uses `Cow<'static, str>` so that values drawn from static lookup
/// tables (statuses, colors, currencies, ...) can be held as zero-cost
/// `&'static str` borrows, while dynamically generated text (emails,
/// sentences, formatted identifiers) is owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Serialize to the string form that crosses the driver boundary.
    pub fn to_boundary_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.to_string(),
        }
    }

    /// String representation used for composite-key/uniqueness tracking.
    pub fn to_unique_key(&self) -> String {
        match self {
            Value::Null => "__NULL__".to_string(),
            Value::Float(f) => format!("{:.10}", f),
            other => other.to_boundary_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_boundary_string())
    }
}

/// Value metadata: the authoritative type hint plus nullness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub r#type: String,
    pub is_null: bool,
}

/// The (column, string-value, metadata) triple that is the lingua franca
/// between generator and driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub column: String,
    pub value: String,
    pub meta: RecordMeta,
}

impl Record {
    pub fn new(column: impl Into<String>, value: &Value, type_hint: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.to_boundary_string(),
            meta: RecordMeta {
                r#type: type_hint.into(),
                is_null: value.is_null(),
            },
        }
    }
}

#[inline]
pub fn owned(s: String) -> Value {
    Value::String(Cow::Owned(s))
}

#[inline]
pub fn borrowed(s: &'static str) -> Value {
    Value::String(Cow::Borrowed(s))
}
