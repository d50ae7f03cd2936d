//! Parquet feature file, written and read through DuckDB.
//!
//! Layout: `customer_id VARCHAR, recency BIGINT, frequency BIGINT, monetary DOUBLE`,
//! one row per customer, sorted by customer id.

use super::RfmRecord;
use crate::store::Store;
use anyhow::{Context, Result};
use duckdb::params;
use std::collections::BTreeMap;
use std::path::Path;

const STAGING_TABLE: &str = "rfm_features_staging";

/// Escape a filesystem path for use inside a single-quoted SQL literal
fn sql_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

/// Write features to a Parquet file at `path`, creating parent directories
pub fn write_features(
    store: &Store,
    features: &BTreeMap<String, RfmRecord>,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let conn = store.connection();
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TEMPORARY TABLE {} (\
            customer_id VARCHAR, recency BIGINT, frequency BIGINT, monetary DOUBLE)",
        STAGING_TABLE
    ))
    .context("Failed to create feature staging table")?;

    {
        let mut insert = conn
            .prepare(&format!("INSERT INTO {} VALUES (?, ?, ?, ?)", STAGING_TABLE))
            .context("Failed to prepare feature insert")?;
        for (customer, rec) in features {
            insert
                .execute(params![customer.as_str(), rec.recency, rec.frequency as i64, rec.monetary])
                .with_context(|| format!("Failed to stage features for {}", customer))?;
        }
    }

    let copied = conn
        .execute_batch(&format!(
            "COPY (SELECT * FROM {} ORDER BY customer_id) TO '{}' (FORMAT PARQUET)",
            STAGING_TABLE,
            sql_path(path)
        ))
        .with_context(|| format!("Failed to write features to {}", path.display()));

    // Staging table goes away whether or not the copy worked
    let _ = store.execute(&format!("DROP TABLE IF EXISTS {}", STAGING_TABLE));
    copied?;

    tracing::info!(
        customers = features.len(),
        path = %path.display(),
        "wrote feature file"
    );
    Ok(())
}

/// Read a feature file written by [`write_features`]
pub fn read_features(store: &Store, path: &Path) -> Result<BTreeMap<String, RfmRecord>> {
    let sql = format!(
        "SELECT CAST(customer_id AS VARCHAR), CAST(recency AS BIGINT), \
         CAST(frequency AS BIGINT), CAST(monetary AS DOUBLE) FROM read_parquet('{}')",
        sql_path(path)
    );

    let mut stmt = store
        .connection()
        .prepare(&sql)
        .with_context(|| format!("Failed to open feature file: {}", path.display()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                RfmRecord {
                    recency: row.get(1)?,
                    frequency: row.get::<_, i64>(2)?.max(0) as u64,
                    monetary: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("Failed to read feature file: {}", path.display()))?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_path_escapes_quotes() {
        assert_eq!(sql_path(Path::new("/tmp/o'brien.parquet")), "/tmp/o''brien.parquet");
    }
}
