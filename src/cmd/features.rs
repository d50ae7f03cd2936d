//! Features command: store to Parquet RFM file.

use crate::config::PipelineConfig;
use crate::rfm::{derive_rfm, write_features};
use crate::store::{QueryResultFormatter, Store};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  northwind-rfm features
  northwind-rfm features --output rfm.parquet --show")]
pub struct FeaturesArgs {
    /// DuckDB store built by `build` [default: data/processed/northwind.duckdb]
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Parquet file to write [default: data/processed/rfm_features.parquet]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// YAML file with pipeline paths
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the written features as a table
    #[arg(long)]
    pub show: bool,
}

pub fn run(args: FeaturesArgs) -> Result<()> {
    let config = PipelineConfig::load_optional(args.config.as_deref())?;
    let paths = config.resolve(PipelineConfig {
        dump: None,
        database: args.database,
        features: args.output,
    });

    if !paths.database.exists() {
        anyhow::bail!(
            "Database not found: {} (run `northwind-rfm build` first)",
            paths.database.display()
        );
    }

    tracing::info!(path = %paths.database.display(), "deriving RFM features");
    let store = Store::open(&paths.database)?;
    for table in ["orders", "order_details"] {
        if !store.table_exists(table) {
            anyhow::bail!(
                "Table {} missing from {} (run `northwind-rfm build` first)",
                table,
                paths.database.display()
            );
        }
    }
    let features = derive_rfm(&store).context("Cannot derive RFM features")?;

    write_features(&store, &features, &paths.features)?;
    eprintln!(
        "Wrote {} customers to {}",
        features.len(),
        paths.features.display()
    );

    if args.show {
        let result = store.query(&format!(
            "SELECT * FROM read_parquet('{}') ORDER BY customer_id",
            paths.features.display().to_string().replace('\'', "''")
        ))?;
        print!("{}", QueryResultFormatter::table(&result));
    }

    Ok(())
}
