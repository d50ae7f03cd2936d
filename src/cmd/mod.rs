mod build;
mod features;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

pub use build::BuildArgs;
pub use features::FeaturesArgs;

#[derive(Parser)]
#[command(name = "northwind-rfm")]
#[command(version)]
#[command(
    about = "Load the Northwind Postgres dump into DuckDB and derive customer RFM features",
    long_about = None
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite the SQL dump and load it into a fresh DuckDB store
    Build(BuildArgs),

    /// Derive RFM features from the store and write them to Parquet
    Features(FeaturesArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build(args) => build::run(args),
        Commands::Features(args) => features::run(args),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "northwind-rfm",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
