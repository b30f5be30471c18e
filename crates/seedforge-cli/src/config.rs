//! Optional `seedforge.toml` configuration file. Purely a CLI-layer
//! convenience for defaulting flags that weren't passed explicitly; the
//! generation core (`seedforge-core`) has no notion of a config file.
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/myapp"
//! schema = "public"
//!
//! [generate]
//! rows = 500
//! seed = 42
//! fk_density_ratio = 15
//! blocked_tables = ["audit_log"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "seedforge.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedforgeConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub rows: Option<usize>,
    pub seed: Option<u64>,
    pub fk_density_ratio: Option<u32>,
    pub blocked_tables: Vec<String>,
}

/// Read `seedforge.toml` from `dir`. Returns `None` when the file is absent
/// (config is entirely optional); an error if it exists but fails to parse.
pub fn read_config(dir: &Path) -> Result<Option<SeedforgeConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: SeedforgeConfig = toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(config))
}

pub fn default_config_dir() -> PathBuf {
    PathBuf::from(".")
}
