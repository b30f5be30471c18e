//! Helpers shared by all three backends: identifier quoting, URL scrubbing
//! for error messages, and the `sqlx::Error -> seedforge_core::Error`
//! boundary every backend crosses the same way.

use seedforge_core::schema::types::DatabaseType;
use seedforge_core::Error;

/// Multi-row `INSERT` batch size — large enough to amortize round trips,
/// small enough that a single statement never approaches a backend's
/// parameter-count ceiling (Postgres caps bound parameters at 65535; at a
/// handful of columns per row, 100 rows is comfortably under that for any
/// realistic table width).
pub const INSERT_BATCH_SIZE: usize = 100;

pub fn quote_identifier(name: &str, db_type: DatabaseType) -> String {
    match db_type {
        DatabaseType::MySQL => format!("`{name}`"),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => format!("\"{name}\""),
    }
}

pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        sql.to_string()
    } else {
        format!("{}...", &sql[..max_len])
    }
}

/// Mask the password component of a connection string for error messages.
/// Falls back to the raw string when it isn't a URL at all (a bare SQLite
/// file path, for instance).
pub fn sanitize_url(db_url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(db_url) {
        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }
        return parsed.to_string();
    }
    db_url.to_string()
}

pub fn driver_error(table: impl Into<String>, row_index: Option<usize>, message: impl Into<String>, source: sqlx::Error) -> Error {
    Error::Driver {
        table: table.into(),
        row_index,
        message: message.into(),
        source: Some(Box::new(source)),
    }
}
