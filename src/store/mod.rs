//! Embedded DuckDB store backing the pipeline.
//!
//! The store is a single database file. Its schema and rows come only from
//! the statements executed by [`Loader`]; nothing else in the crate creates
//! tables in it, apart from temporary staging tables that never outlive a call.
//!
//! ```ignore
//! use northwind_rfm::store::{QueryResultFormatter, Store};
//!
//! let store = Store::open(Path::new("data/processed/northwind.duckdb"))?;
//! let result = store.query("SELECT COUNT(*) FROM orders")?;
//! print!("{}", QueryResultFormatter::table(&result));
//! ```

mod loader;
mod output;

pub use loader::{
    extract_table_name, load_dump, LoadError, LoadPlan, LoadReport, Loader, Phase, PhaseCounts,
    PlannedStatement, StatementFailure,
};
pub use output::QueryResultFormatter;

use anyhow::{Context, Result};
use duckdb::types::ValueRef;
use duckdb::Connection;
use std::path::Path;

/// Result of an ad-hoc query, with every value rendered as text
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Owned handle to the database file. The connection closes on drop.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database: {}", path.display()))?;

        Ok(Self { conn })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory DuckDB database")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a single statement that returns no rows
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .with_context(|| format!("Failed to execute: {}", sql))
    }

    /// Run a query and render every value as text
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare query: {}", sql))?;

        let mut rows = Vec::new();
        {
            let mut result = stmt
                .query([])
                .with_context(|| format!("Failed to execute query: {}", sql))?;

            while let Some(row) = result.next()? {
                let width = row.as_ref().column_count();
                let values = (0..width)
                    .map(|i| match row.get_ref(i) {
                        Ok(value) => render_value(value),
                        Err(_) => "ERROR".to_string(),
                    })
                    .collect::<Vec<_>>();
                rows.push(values);
            }
        }

        // Column metadata is only available once the statement has run
        let columns = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        Ok(QueryResult { columns, rows })
    }

    /// Tables in the main schema, sorted by name
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let result = self.query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name",
        )?;
        Ok(result.rows.into_iter().map(|mut r| r.remove(0)).collect())
    }

    pub fn table_exists(&self, table: &str) -> bool {
        let query = "SELECT 1 FROM information_schema.tables WHERE table_name = ? LIMIT 1";
        match self.conn.prepare(query) {
            Ok(mut stmt) => stmt.exists([table]).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Row count of a table
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count.max(0) as u64)
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Boolean(b) => b.to_string(),
        ValueRef::TinyInt(n) => n.to_string(),
        ValueRef::SmallInt(n) => n.to_string(),
        ValueRef::Int(n) => n.to_string(),
        ValueRef::BigInt(n) => n.to_string(),
        ValueRef::HugeInt(n) => n.to_string(),
        ValueRef::UTinyInt(n) => n.to_string(),
        ValueRef::USmallInt(n) => n.to_string(),
        ValueRef::UInt(n) => n.to_string(),
        ValueRef::UBigInt(n) => n.to_string(),
        ValueRef::Float(f) => f.to_string(),
        ValueRef::Double(f) => f.to_string(),
        ValueRef::Decimal(d) => d.to_string(),
        ValueRef::Text(s) => String::from_utf8_lossy(s).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
        ValueRef::Date32(days) => chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| days.to_string()),
        // Microseconds since epoch
        ValueRef::Timestamp(_, micros) => {
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| micros.to_string())
        }
        other => format!("{:?}", other),
    }
}
