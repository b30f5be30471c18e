//! Data model and Type Mapper.
//!
//! `Column`/`Table`/`ForeignKey`/`Constraints` are the structural vocabulary
//! every other module is written against; `TypeClass`/`NormalizedType` are
//! the Type Mapper that turns a raw column-type string into something the
//! Value Generator can dispatch on.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::MySQL => write!(f, "MySQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// Top-level schema: every table reachable from the driver's introspection,
/// keyed in declaration order so iteration is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: IndexMap<String, Table>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self {
            tables: IndexMap::new(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Primary-key columns that are not auto-increment, in column order.
    /// Used for the composite-key string in the PK tracker.
    pub fn trackable_pk_columns(&self) -> Vec<&str> {
        let Some(pk) = &self.primary_key else {
            return Vec::new();
        };
        pk.columns
            .iter()
            .filter(|name| {
                self.columns
                    .get(name.as_str())
                    .map(|c| !c.is_auto_increment)
                    .unwrap_or(false)
            })
            .map(|s| s.as_str())
            .collect()
    }

    pub fn auto_increment_column(&self) -> Option<&str> {
        self.primary_key.as_ref().and_then(|pk| {
            pk.columns.iter().find_map(|name| {
                self.columns
                    .get(name.as_str())
                    .filter(|c| c.is_auto_increment)
                    .map(|_| name.as_str())
            })
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

/// A single column descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub raw_type: String,
    pub length: Option<u32>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub is_primary: bool,
    pub is_auto_increment: bool,
    pub is_computed: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
    pub referenced_table: Option<String>,
    pub ordinal_position: u32,
}

impl Column {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            length: None,
            precision: None,
            scale: None,
            is_primary: false,
            is_auto_increment: false,
            is_computed: false,
            is_foreign_key: false,
            is_nullable: true,
            referenced_table: None,
            ordinal_position: 0,
        }
    }
}

/// A foreign-key relationship on one source column. Composite FKs are
/// represented as several `ForeignKey` entries sharing `referenced_table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub source_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// An open mapping from constraint names to values.
///
/// Backed by a plain `HashMap<String, ConstraintValue>` rather than a fixed
/// struct because the source catalogs (SQL CHECK clauses, JSON-schema
/// validators, BSON document validators) don't agree on which keys are
/// present, and numeric values arrive in whatever runtime shape their
/// decoder produced them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints(pub HashMap<String, ConstraintValue>);

/// Any of the runtime shapes a JSON/BSON decoder might hand back for a
/// constraint value. `as_f64`/`as_usize` normalize across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
}

impl ConstraintValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstraintValue::Int(i) => Some(*i as f64),
            ConstraintValue::Float(f) => Some(*f),
            ConstraintValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ConstraintValue::Int(i) if *i >= 0 => Some(*i as usize),
            ConstraintValue::Float(f) if *f >= 0.0 => Some(*f as usize),
            ConstraintValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstraintValue::Bool(b) => Some(*b),
            ConstraintValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstraintValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            ConstraintValue::StringList(v) => Some(v),
            _ => None,
        }
    }
}

impl Constraints {
    pub fn get(&self, key: &str) -> Option<&ConstraintValue> {
        self.0.get(key)
    }

    pub fn nullable(&self) -> Option<bool> {
        self.get("nullable").and_then(|v| v.as_bool())
    }

    pub fn check_min(&self) -> Option<f64> {
        self.get("check_min")
            .or_else(|| self.get("minimum"))
            .and_then(|v| v.as_f64())
    }

    pub fn check_max(&self) -> Option<f64> {
        self.get("check_max")
            .or_else(|| self.get("maximum"))
            .and_then(|v| v.as_f64())
    }

    pub fn check_values(&self) -> Option<&[String]> {
        self.get("check_values").and_then(|v| v.as_string_list())
    }

    pub fn length(&self) -> Option<usize> {
        self.get("length")
            .or_else(|| self.get("maxLength"))
            .and_then(|v| v.as_usize())
    }

    /// Precision/scale, clamped so that `scale <= precision`. Catalogs from
    /// different backends occasionally report a scale larger than the
    /// precision; rather than propagate that as a generator error, it's
    /// silently clamped down to the precision.
    pub fn precision_scale(&self) -> (Option<i64>, Option<i64>) {
        let precision = self.get("precision").and_then(|v| v.as_f64()).map(|f| f as i64);
        let scale = self.get("scale").and_then(|v| v.as_f64()).map(|f| f as i64);
        match (precision, scale) {
            (Some(p), Some(s)) if s > p => (Some(p), Some(p)),
            other => other,
        }
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.get("type").and_then(|v| v.as_str())
    }

    pub fn is_json(&self) -> bool {
        self.get("is_json").and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

/// Coarse type class the value generator dispatches its generic behavior on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Int,
    Uint,
    Float,
    Bool,
    Date,
    DateTime,
    Uuid,
    Json,
    Text,
    Array,
}

/// The result of running the Type Mapper over a raw column-type
/// string: the coarse class plus the stripped/lowercased token the richer
/// per-type Value Generator pattern-matches on for the quirkier types
/// (timestamptz, interval, hstore, inet, ...) the coarse class collapses.
#[derive(Debug, Clone)]
pub struct NormalizedType {
    pub class: TypeClass,
    pub stripped: String,
    pub is_array: bool,
}

const INT_TYPES: &[&str] = &[
    "smallint", "int2", "integer", "int", "int4", "bigint", "int8", "mediumint", "tinyint",
    "serial", "serial4", "bigserial", "serial8", "smallserial", "serial2", "year",
];
const UINT_TYPES: &[&str] = &["oid", "unsigned", "unsigned integer"];
const FLOAT_TYPES: &[&str] = &[
    "real", "float4", "float", "double precision", "float8", "double", "numeric", "decimal",
    "money",
];
const BOOL_TYPES: &[&str] = &["boolean", "bool", "bit"];
const DATE_TYPES: &[&str] = &["date"];
const DATETIME_TYPES: &[&str] = &[
    "timestamp",
    "timestamp without time zone",
    "timestamp with time zone",
    "timestamptz",
    "datetime",
];
const UUID_TYPES: &[&str] = &["uuid"];
const JSON_TYPES: &[&str] = &["json", "jsonb", "bson"];
const TEXT_TYPES: &[&str] = &[
    "text",
    "tinytext",
    "mediumtext",
    "longtext",
    "clob",
    "char",
    "character",
    "varchar",
    "character varying",
    "xml",
    "hstore",
    "bytea",
    "blob",
    "tinyblob",
    "mediumblob",
    "longblob",
    "binary",
    "varbinary",
    "inet",
    "cidr",
    "macaddr",
    "macaddr8",
    "point",
    "interval",
    "time",
    "time without time zone",
];

/// Type Mapper. Rules, in order:
/// 1. `[]` anywhere in the uppercased type -> array.
/// 2. Starts with `TIMESTAMP` -> datetime.
/// 3. Starts with `TIME` but not `TINYINT` -> datetime.
/// 4. Strip a trailing `(...)` size specifier, trim.
/// 5. Look the stripped token up in the named sets above, first match wins.
/// 6. Default: text.
pub fn normalize_type(raw: &str) -> NormalizedType {
    let upper = raw.to_uppercase();
    let is_array = upper.contains("[]");

    let base = if is_array {
        upper.replace("[]", "")
    } else {
        upper.clone()
    };

    if base.starts_with("TIMESTAMP") {
        return NormalizedType {
            class: TypeClass::DateTime,
            stripped: strip_size(&base).to_lowercase(),
            is_array,
        };
    }
    if base.starts_with("TIME") && !base.starts_with("TINYINT") {
        return NormalizedType {
            class: TypeClass::DateTime,
            stripped: strip_size(&base).to_lowercase(),
            is_array,
        };
    }

    let stripped = strip_size(&base).to_lowercase();
    let class = classify_stripped(&stripped);

    NormalizedType {
        class: if is_array { TypeClass::Array } else { class },
        stripped,
        is_array,
    }
}

fn classify_stripped(stripped: &str) -> TypeClass {
    if INT_TYPES.contains(&stripped) {
        TypeClass::Int
    } else if UINT_TYPES.contains(&stripped) {
        TypeClass::Uint
    } else if FLOAT_TYPES.iter().any(|t| stripped.starts_with(t)) {
        TypeClass::Float
    } else if BOOL_TYPES.contains(&stripped) {
        TypeClass::Bool
    } else if DATE_TYPES.contains(&stripped) {
        TypeClass::Date
    } else if DATETIME_TYPES.contains(&stripped) {
        TypeClass::DateTime
    } else if UUID_TYPES.contains(&stripped) {
        TypeClass::Uuid
    } else if JSON_TYPES.contains(&stripped) {
        TypeClass::Json
    } else if TEXT_TYPES.contains(&stripped) {
        TypeClass::Text
    } else {
        TypeClass::Text
    }
}

/// Strip a trailing `(...)` size/precision specifier and trim whitespace.
fn strip_size(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.find('(') {
        Some(idx) => trimmed[..idx].trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_suffix_wins_over_everything_else() {
        let t = normalize_type("INTEGER[]");
        assert_eq!(t.class, TypeClass::Array);
        assert!(t.is_array);
    }

    #[test]
    fn timestamp_prefix_is_datetime() {
        assert_eq!(normalize_type("TIMESTAMPTZ").class, TypeClass::DateTime);
        assert_eq!(normalize_type("timestamp without time zone").class, TypeClass::DateTime);
    }

    #[test]
    fn time_prefix_is_datetime_but_tinyint_is_not() {
        assert_eq!(normalize_type("TIME").class, TypeClass::DateTime);
        assert_eq!(normalize_type("TINYINT").class, TypeClass::Int);
    }

    #[test]
    fn size_specifier_is_stripped() {
        let t = normalize_type("VARCHAR(255)");
        assert_eq!(t.stripped, "varchar");
        assert_eq!(t.class, TypeClass::Text);
    }

    #[test]
    fn numeric_defaults_to_float_class() {
        assert_eq!(normalize_type("NUMERIC(5,2)").class, TypeClass::Float);
        assert_eq!(normalize_type("decimal").class, TypeClass::Float);
    }

    #[test]
    fn unknown_type_defaults_to_text() {
        assert_eq!(normalize_type("some_weird_enum_type").class, TypeClass::Text);
    }

    #[test]
    fn precision_scale_clamps_scale_to_precision() {
        let mut c = Constraints::default();
        c.0.insert("precision".into(), ConstraintValue::Int(5));
        c.0.insert("scale".into(), ConstraintValue::Int(9));
        assert_eq!(c.precision_scale(), (Some(5), Some(5)));
    }
}
