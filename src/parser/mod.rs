//! Statement splitting and classification for rewritten dumps.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE TABLE ...`
    CreateTable,
    /// `INSERT INTO ...`
    Insert,
    /// Anything else, dropped by the classifier
    Other,
}

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"CREATE TABLE\s+(\w+)").unwrap());

static INSERT_INTO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^INSERT INTO\s+(\w+)").unwrap());

/// Statements retained by the classifier, each list in dump order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStatements {
    pub creates: Vec<String>,
    pub inserts: Vec<String>,
    /// Non-empty statements that matched neither prefix
    pub discarded: usize,
}

impl ClassifiedStatements {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.inserts.is_empty()
    }
}

/// Split SQL text on `;`, trimming each piece and dropping empty ones.
///
/// A `;` inside a single-quoted string literal or a double-quoted identifier
/// does not terminate the statement. Doubled quotes (`''`) inside a literal
/// toggle out and back in, so they need no special casing. Backslashes are
/// not escapes in standard-conforming Postgres strings.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut inside_single_quote = false;
    let mut inside_double_quote = false;
    let mut start = 0;

    for (i, c) in sql.char_indices() {
        match c {
            '\'' if !inside_double_quote => inside_single_quote = !inside_single_quote,
            '"' if !inside_single_quote => inside_double_quote = !inside_double_quote,
            ';' if !inside_single_quote && !inside_double_quote => {
                push_trimmed(&mut statements, &sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    // Trailing statement without a terminator
    push_trimmed(&mut statements, &sql[start..]);
    statements
}

#[inline]
fn push_trimmed(statements: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Classify a trimmed statement by its leading keywords
pub fn classify(stmt: &str) -> StatementKind {
    if stmt.starts_with("CREATE TABLE") {
        StatementKind::CreateTable
    } else if stmt.starts_with("INSERT INTO") {
        StatementKind::Insert
    } else {
        StatementKind::Other
    }
}

/// Split and classify rewritten SQL text
pub fn classify_statements(sql: &str) -> ClassifiedStatements {
    let mut result = ClassifiedStatements::default();

    for stmt in split_statements(sql) {
        match classify(&stmt) {
            StatementKind::CreateTable => result.creates.push(stmt),
            StatementKind::Insert => result.inserts.push(stmt),
            StatementKind::Other => result.discarded += 1,
        }
    }

    result
}

/// Table named by a `CREATE TABLE` statement: the first word token after the keywords
pub fn create_table_name(stmt: &str) -> Option<&str> {
    CREATE_TABLE_RE
        .captures(stmt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Table targeted by an `INSERT INTO` statement
pub fn insert_table_name(stmt: &str) -> Option<&str> {
    INSERT_INTO_RE
        .captures(stmt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
