//! Build command: dump file to DuckDB store.

use crate::config::PipelineConfig;
use crate::input::read_dump;
use crate::parser::classify_statements;
use crate::rewrite::rewrite;
use crate::store::{load_dump, LoadPlan, Phase, Store};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  northwind-rfm build
  northwind-rfm build --dump northwind.sql.gz --database nw.duckdb
  northwind-rfm build --dry-run
  northwind-rfm build --config pipeline.yaml --json")]
pub struct BuildArgs {
    /// SQL dump to load (supports .gz, .bz2, .xz, .zst) [default: data/external/northwind.sql]
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// DuckDB store to (re)create [default: data/processed/northwind.duckdb]
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// YAML file with pipeline paths
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the load plan without touching the store
    #[arg(long)]
    pub dry_run: bool,

    /// Show a progress bar while executing statements
    #[arg(short, long)]
    pub progress: bool,

    /// Print the load report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let config = PipelineConfig::load_optional(args.config.as_deref())?;
    let paths = config.resolve(PipelineConfig {
        dump: args.dump,
        database: args.database,
        features: None,
    });

    tracing::info!(path = %paths.dump.display(), "reading SQL dump");
    let dump = read_dump(&paths.dump)?;

    if args.dry_run {
        let classified = classify_statements(&rewrite(&dump));
        let plan = LoadPlan::build(&classified)?;
        println!("Load plan for {}:", paths.dump.display());
        println!("  drop:      {}", plan.count(Phase::Drop));
        println!("  create:    {}", plan.count(Phase::Create));
        println!("  insert:    {}", plan.count(Phase::Insert));
        println!("  discarded: {}", classified.discarded);
        println!("(dry run, {} not modified)", paths.database.display());
        return Ok(());
    }

    tracing::info!(path = %paths.database.display(), "building database");
    let store = Store::open(&paths.database)?;
    let report = load_dump(&store, &dump, args.progress)
        .with_context(|| format!("Cannot load {}", paths.dump.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
        for table in store.list_tables()? {
            println!("  {:<24} {:>8} rows", table, store.count_rows(&table)?);
        }
        for failure in &report.failures {
            eprintln!("Failed {}: {}", failure.phase, failure.error);
        }
    }

    Ok(())
}
