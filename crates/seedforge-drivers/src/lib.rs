//! Concrete `Driver` implementations for Postgres, MySQL and SQLite.
//! `seedforge-core` never depends on this crate; it only sees `&dyn Driver`.

pub mod mysql;
pub mod postgres;
pub mod sqlite;
mod support;

pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;
pub use support::sanitize_url;

use seedforge_core::schema::types::DatabaseType;
use seedforge_core::Error;

/// Resolve a connection URL's scheme to the backend it addresses.
pub fn database_type_from_url(url: &str) -> Result<DatabaseType, Error> {
    let scheme = url.split("://").next().unwrap_or("");
    match scheme {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
        "sqlite" | "file" => Ok(DatabaseType::SQLite),
        other => Err(Error::Other(format!("unsupported database scheme '{other}'; supported: postgres://, mysql://, sqlite://"))),
    }
}
