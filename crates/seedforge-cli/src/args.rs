use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "seedforge",
    about = "Generate realistic, constraint-safe seed data for a target table and its dependency closure",
    version,
    after_help = "Examples:\n  seedforge generate orders --db postgres://localhost/myapp --rows 1000\n  seedforge generate orders --rows 100 --overwrite   # auto-detect DB from .env\n  seedforge introspect --db postgres://localhost/myapp"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate seed data for a target table and its FK dependency closure
    Generate(GenerateArgs),

    /// Introspect a database schema and display its tables, columns and FK edges
    Introspect(IntrospectArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Target table to populate; its FK dependency closure is discovered and
    /// populated alongside it.
    pub table: String,

    /// Database connection URL (postgres://, mysql://, sqlite://).
    /// Falls back to DATABASE_URL env var, .env, or seedforge.toml.
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Number of rows to generate for the target table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Clear the target table's dependency closure (FK-safely) before generating
    #[arg(long)]
    pub overwrite: bool,

    /// `parent_rows = max(1, child_rows / ratio)` (default 20)
    #[arg(long)]
    pub fk_density_ratio: Option<u32>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Schema/namespace to introspect (default: "public" for Postgres; ignored by MySQL/SQLite)
    #[arg(long)]
    pub schema: Option<String>,

    /// Tables for which mock-data generation is disabled; their existing rows
    /// are used as foreign-key sources instead of generating new ones.
    #[arg(long, value_delimiter = ',')]
    pub blocked: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct IntrospectArgs {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema/namespace to introspect
    #[arg(long)]
    pub schema: Option<String>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: IntrospectFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum IntrospectFormat {
    Table,
    Json,
}
