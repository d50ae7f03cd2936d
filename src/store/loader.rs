//! Load plan construction and execution.
//!
//! A plan is every `DROP TABLE IF EXISTS` (one per `CREATE TABLE`, same order),
//! then every `CREATE TABLE`, then every `INSERT INTO`, the last two in dump
//! order. Each statement runs in its own autocommit transaction, so a failure
//! only loses that statement and nothing earlier is rolled back.

use super::Store;
use crate::parser::{self, ClassifiedStatements};
use crate::rewrite;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// No table identifier follows `CREATE TABLE`, so no drop can be derived
    #[error("cannot extract a table name from CREATE TABLE statement: {statement}")]
    MissingTableName { statement: String },
}

/// Table a `CREATE TABLE` statement defines, as required for its drop
pub fn extract_table_name(create_sql: &str) -> Result<String, LoadError> {
    parser::create_table_name(create_sql)
        .map(str::to_string)
        .ok_or_else(|| LoadError::MissingTableName {
            statement: create_sql.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Drop,
    Create,
    Insert,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Drop => write!(f, "drop"),
            Phase::Create => write!(f, "create"),
            Phase::Insert => write!(f, "insert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    pub phase: Phase,
    /// Target table; `None` for inserts whose target could not be read
    pub table: Option<String>,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadPlan {
    statements: Vec<PlannedStatement>,
}

impl LoadPlan {
    /// Build the ordered plan from classified statements.
    ///
    /// Fails without producing a partial plan if any `CREATE TABLE` has no
    /// extractable table name.
    pub fn build(classified: &ClassifiedStatements) -> Result<Self, LoadError> {
        let tables = classified
            .creates
            .iter()
            .map(|stmt| extract_table_name(stmt))
            .collect::<Result<Vec<_>, _>>()?;

        let mut statements =
            Vec::with_capacity(tables.len() * 2 + classified.inserts.len());

        statements.extend(tables.iter().map(|table| PlannedStatement {
            phase: Phase::Drop,
            table: Some(table.clone()),
            sql: format!("DROP TABLE IF EXISTS {}", table),
        }));

        statements.extend(
            tables
                .into_iter()
                .zip(&classified.creates)
                .map(|(table, sql)| PlannedStatement {
                    phase: Phase::Create,
                    table: Some(table),
                    sql: sql.clone(),
                }),
        );

        statements.extend(classified.inserts.iter().map(|sql| PlannedStatement {
            phase: Phase::Insert,
            table: parser::insert_table_name(sql).map(str::to_string),
            sql: sql.clone(),
        }));

        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[PlannedStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.statements.iter().filter(|s| s.phase == phase).count()
    }

    /// Generated drop statements, in plan order
    pub fn drops(&self) -> impl Iterator<Item = &PlannedStatement> {
        self.statements.iter().filter(|s| s.phase == Phase::Drop)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub drop: usize,
    pub create: usize,
    pub insert: usize,
}

impl PhaseCounts {
    fn bump(&mut self, phase: Phase) {
        match phase {
            Phase::Drop => self.drop += 1,
            Phase::Create => self.create += 1,
            Phase::Insert => self.insert += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.drop + self.create + self.insert
    }
}

/// A statement the store rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementFailure {
    pub phase: Phase,
    pub statement: String,
    pub error: String,
}

/// Outcome of running a [`LoadPlan`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub succeeded: PhaseCounts,
    pub failed: PhaseCounts,
    pub failures: Vec<StatementFailure>,
    /// Non-empty statements dropped by the classifier
    pub discarded: usize,
    pub duration_secs: f64,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tables created, {} inserts applied, {} statements failed in {:.2}s",
            self.succeeded.create,
            self.succeeded.insert,
            self.failed.total(),
            self.duration_secs
        )
    }
}

/// Executes a [`LoadPlan`] against a [`Store`]
pub struct Loader<'a> {
    store: &'a Store,
    progress: bool,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            progress: false,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Execute every planned statement in order, recording failures and continuing
    pub fn run(&self, plan: &LoadPlan) -> LoadReport {
        let start = std::time::Instant::now();
        let mut report = LoadReport::default();

        let progress_bar = if self.progress {
            let pb = ProgressBar::new(plan.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} statements ({percent}%)",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            Some(pb)
        } else {
            None
        };

        for planned in plan.statements() {
            match self.store.connection().execute(&planned.sql, []) {
                Ok(_) => report.succeeded.bump(planned.phase),
                Err(e) => {
                    tracing::error!(
                        phase = %planned.phase,
                        statement = %planned.sql,
                        error = %e,
                        "statement failed, continuing"
                    );
                    report.failed.bump(planned.phase);
                    report.failures.push(StatementFailure {
                        phase: planned.phase,
                        statement: planned.sql.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Load complete");
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        report
    }
}

/// Rewrite, classify, plan and load a raw dump into `store`
pub fn load_dump(store: &Store, dump: &str, progress: bool) -> Result<LoadReport, LoadError> {
    let rewritten = rewrite::rewrite_with_stats(dump);
    for hit in rewritten.hits.iter().filter(|h| h.matches > 0) {
        tracing::debug!(rule = hit.rule, matches = hit.matches, "rewrite rule applied");
    }

    let classified = parser::classify_statements(&rewritten.text);
    tracing::info!(
        creates = classified.creates.len(),
        inserts = classified.inserts.len(),
        discarded = classified.discarded,
        "classified dump statements"
    );

    let plan = LoadPlan::build(&classified)?;
    tracing::info!(statements = plan.len(), "executing load plan");

    let mut report = Loader::new(store).with_progress(progress).run(&plan);
    report.discarded = classified.discarded;

    tracing::info!(
        created = report.succeeded.create,
        inserted = report.succeeded.insert,
        failed = report.failed.total(),
        "load finished"
    );
    Ok(report)
}
