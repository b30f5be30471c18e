use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};

use seedforge_core::{generate, GenerateRequest};

use crate::args::GenerateArgs;
use crate::commands::{connect, resolve_db_url, resolve_schema};
use crate::config;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let cfg = config::read_config(&config::default_config_dir())?;

    let db_url = resolve_db_url(args.db.as_deref(), cfg.as_ref())?;
    let schema = resolve_schema(args.schema.as_deref(), cfg.as_ref());

    let mut blocked = args.blocked.clone();
    if let Some(cfg) = &cfg {
        for table in &cfg.generate.blocked_tables {
            if !blocked.contains(table) {
                blocked.push(table.clone());
            }
        }
    }

    let row_count = args.rows.or_else(|| cfg.as_ref().and_then(|c| c.generate.rows)).unwrap_or(100);
    let seed = args.seed.or_else(|| cfg.as_ref().and_then(|c| c.generate.seed));
    let fk_density_ratio = args
        .fk_density_ratio
        .or_else(|| cfg.as_ref().and_then(|c| c.generate.fk_density_ratio))
        .unwrap_or(seedforge_core::constants::DEFAULT_FK_DENSITY_RATIO);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}").unwrap());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(format!("Connecting and analyzing dependency closure for '{}'...", args.table));

    let driver = connect(&db_url, schema.as_deref(), blocked).await?;

    let request = GenerateRequest {
        target_table: args.table.clone(),
        row_count,
        overwrite: args.overwrite,
        fk_density_ratio,
        seed,
    };

    pb.set_message(format!("Generating {} row(s) for '{}' and its dependencies...", row_count, args.table));
    let result = generate(driver.as_ref(), &request).await?;
    pb.finish_with_message(format!("Generated {} row(s) across {} table(s)", result.total_rows, result.tables.len()));

    let mut table = ComfyTable::new();
    table.set_header(vec!["Table", "Rows generated", "Used existing data"]);
    for t in &result.tables {
        table.add_row(vec![
            Cell::new(&t.table),
            Cell::new(t.rows_generated.to_string()),
            Cell::new(if t.used_existing_data { "yes" } else { "" }),
        ]);
    }
    println!("{table}");

    if !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    if let Some(seed) = seed {
        eprintln!("\nSeed: {seed} (reuse with --seed {seed} for the same data)");
    }

    Ok(())
}
