//! Terminal rendering of query results.

use super::QueryResult;
use std::fmt::Write as _;

/// Widest a table cell may get before truncation
const MAX_CELL_WIDTH: usize = 40;

pub struct QueryResultFormatter;

impl QueryResultFormatter {
    /// Render as a boxed table followed by a row count
    pub fn table(result: &QueryResult) -> String {
        if result.columns.is_empty() {
            return String::new();
        }

        let widths: Vec<usize> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                result
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(col.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .min(MAX_CELL_WIDTH)
            })
            .collect();

        let rule = |left: char, mid: char, right: char| {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{}{}{}\n", left, inner.join(&mid.to_string()), right)
        };
        let line = |cells: &[String]| {
            let mut out = String::from("│");
            for (cell, width) in cells.iter().zip(&widths) {
                let _ = write!(out, " {:<width$} │", Self::truncate(cell, *width), width = width);
            }
            out.push('\n');
            out
        };

        let mut out = rule('┌', '┬', '┐');
        out.push_str(&line(&result.columns));
        out.push_str(&rule('├', '┼', '┤'));
        for row in &result.rows {
            out.push_str(&line(row));
        }
        out.push_str(&rule('└', '┴', '┘'));

        let n = result.row_count();
        let _ = writeln!(out, "{} row{}", n, if n == 1 { "" } else { "s" });
        out
    }

    /// Truncate on a char boundary, marking the cut with an ellipsis
    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
            kept + "…"
        }
    }
}
