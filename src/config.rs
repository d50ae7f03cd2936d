//! YAML configuration for pipeline paths.
//!
//! Every stage takes explicit paths. Defaults are resolved once, at the CLI
//! boundary, with precedence: command-line flag, then config file, then the
//! built-in project layout below.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DUMP_PATH: &str = "data/external/northwind.sql";
pub const DEFAULT_DATABASE_PATH: &str = "data/processed/northwind.duckdb";
pub const DEFAULT_FEATURES_PATH: &str = "data/processed/rfm_features.parquet";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Raw SQL dump
    pub dump: Option<PathBuf>,
    /// DuckDB store file
    pub database: Option<PathBuf>,
    /// Parquet feature file
    pub features: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;
        let config: PipelineConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use an empty config
    pub fn load_optional(path: Option<&Path>) -> anyhow::Result<Self> {
        path.map(Self::load).transpose().map(Option::unwrap_or_default)
    }

    /// Layer command-line overrides on top of this config and the defaults
    pub fn resolve(&self, overrides: PipelineConfig) -> ResolvedPaths {
        ResolvedPaths {
            dump: overrides
                .dump
                .or_else(|| self.dump.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DUMP_PATH)),
            database: overrides
                .database
                .or_else(|| self.database.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            features: overrides
                .features
                .or_else(|| self.features.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FEATURES_PATH)),
        }
    }
}

/// Fully resolved paths handed to each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub dump: PathBuf,
    pub database: PathBuf,
    pub features: PathBuf,
}
