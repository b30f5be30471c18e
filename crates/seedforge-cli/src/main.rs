use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod config;

use args::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let _ = dotenvy::dotenv();

    let result = match &cli.command {
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Introspect(args) => commands::introspect::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
