pub mod generate;
pub mod introspect;

use anyhow::{bail, Context, Result};

use seedforge_core::schema::types::DatabaseType;
use seedforge_core::Driver;
use seedforge_drivers::{database_type_from_url, MySqlDriver, PostgresDriver, SqliteDriver};

use crate::config::SeedforgeConfig;

/// Resolve a database URL in priority order: explicit flag, `DATABASE_URL`
/// env var (including from a loaded `.env`), then `seedforge.toml`.
pub fn resolve_db_url(explicit: Option<&str>, config: Option<&SeedforgeConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }
    if let Some(cfg) = config {
        if let Some(url) = &cfg.database.url {
            return Ok(url.clone());
        }
    }
    bail!(
        "no database URL provided. seedforge looks for a connection in this order:\n  \
         1. --db flag\n  2. DATABASE_URL environment variable (including .env)\n  \
         3. seedforge.toml [database] section\n\n\
         Example: seedforge generate orders --db postgres://localhost/myapp --rows 100"
    )
}

pub fn resolve_schema(explicit: Option<&str>, config: Option<&SeedforgeConfig>) -> Option<String> {
    explicit.map(|s| s.to_string()).or_else(|| config.and_then(|c| c.database.schema.clone()))
}

/// Connect the right backend for `db_url`'s scheme and box it behind the
/// `Driver` trait object the orchestrator consumes.
pub async fn connect(db_url: &str, schema: Option<&str>, blocked: Vec<String>) -> Result<Box<dyn Driver>> {
    let db_type = database_type_from_url(db_url)?;
    let driver: Box<dyn Driver> = match db_type {
        DatabaseType::PostgreSQL => {
            let mut driver = PostgresDriver::connect(db_url).await.context("failed to connect to PostgreSQL")?;
            if let Some(schema) = schema {
                driver = driver.with_schema(schema);
            }
            Box::new(driver.with_blocked_tables(blocked))
        }
        DatabaseType::MySQL => {
            let driver = MySqlDriver::connect(db_url).await.context("failed to connect to MySQL")?;
            Box::new(driver.with_blocked_tables(blocked))
        }
        DatabaseType::SQLite => {
            let driver = SqliteDriver::connect(db_url).await.context("failed to connect to SQLite")?;
            Box::new(driver.with_blocked_tables(blocked))
        }
    };
    Ok(driver)
}
