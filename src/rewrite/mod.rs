//! Dialect rewriting for Postgres dumps.
//!
//! The rewrite is an ordered list of regex substitution rules applied as a
//! pipeline. Order matters: comments are removed before anything else so a
//! commented-out `SET` or type token never reaches the later rules, and whole
//! hex literals are nulled before the bare `\x` marker rule runs.
//!
//! Comment and type-name rules never fire inside `'...'` literals or
//! `"..."` identifiers, so row data such as `'a--b'` or `'real estate'`
//! passes through untouched.
//!
//! The rules are closed over the Northwind dump. They are not a general
//! Postgres-to-DuckDB translation.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A quoted literal or identifier, with `''` / `""` escapes
const QUOTED: &str = r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#;

/// A single substitution step in the rewrite pipeline
pub struct RewriteRule {
    /// Short identifier used in logs and stats
    pub name: &'static str,
    pub pattern: Regex,
    /// Replacement text, may reference capture groups (`${1}`)
    pub replacement: &'static str,
    /// Quoted text is matched into group 1 and copied through unchanged
    pub skips_quoted: bool,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            replacement,
            skips_quoted: false,
        }
    }

    /// A rule that only applies outside quoted text. `pattern` must not
    /// contain capture groups.
    fn outside_quotes(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!("({})|{}", QUOTED, pattern)).unwrap(),
            replacement,
            skips_quoted: true,
        }
    }

    /// Apply the rule, returning the new text and the number of replacements
    fn apply(&self, text: &str) -> (String, usize) {
        if !self.skips_quoted {
            let matches = self.pattern.find_iter(text).count();
            if matches == 0 {
                return (text.to_string(), 0);
            }
            let out = self.pattern.replace_all(text, self.replacement).into_owned();
            return (out, matches);
        }

        let mut matches = 0;
        let out = self.pattern.replace_all(text, |caps: &Captures| match caps.get(1) {
            Some(quoted) => quoted.as_str().to_string(),
            None => {
                matches += 1;
                let mut dst = String::new();
                caps.expand(self.replacement, &mut dst);
                dst
            }
        });
        (out.into_owned(), matches)
    }
}

static RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::outside_quotes("comments", r"--[^\n]*|(?s:/\*.*?\*/)", ""),
        RewriteRule::new("session-settings", r"(?m)^[ \t]*SET [^\n]*\n?", ""),
        RewriteRule::new(
            "search-path-reset",
            r"SELECT pg_catalog\.set_config\('search_path', '', false\);",
            "",
        ),
        RewriteRule::new("varchar", r"character varying\((\d+)\)", "VARCHAR(${1})"),
        RewriteRule::outside_quotes("bytea", r"\bbytea\b", "BLOB"),
        // DuckDB REAL is 4 bytes; prices and discounts need the full double
        RewriteRule::outside_quotes("real", r"\breal\b", "DOUBLE"),
        // Binary payloads are not decoded, the column ends up NULL
        RewriteRule::new("hex-literals", r"'\\x[0-9A-Fa-f]*'", "NULL"),
        RewriteRule::new("hex-markers", r"\\x", "NULL"),
    ]
});

/// The rewrite rules in application order
pub fn rules() -> &'static [RewriteRule] {
    &RULES
}

/// Number of matches a rule replaced during one rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHits {
    pub rule: &'static str,
    pub matches: usize,
}

/// Output of [`rewrite_with_stats`]
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub text: String,
    /// One entry per rule, in application order
    pub hits: Vec<RuleHits>,
}

impl Rewritten {
    /// Total replacements across all rules
    pub fn total_matches(&self) -> usize {
        self.hits.iter().map(|h| h.matches).sum()
    }
}

/// Rewrite a raw Postgres dump into DuckDB-loadable SQL
pub fn rewrite(input: &str) -> String {
    RULES
        .iter()
        .fold(input.to_string(), |text, rule| rule.apply(&text).0)
}

/// Like [`rewrite`], but also reports how often each rule fired
pub fn rewrite_with_stats(input: &str) -> Rewritten {
    let mut text = input.to_string();
    let mut hits = Vec::with_capacity(RULES.len());

    for rule in RULES.iter() {
        let (out, matches) = rule.apply(&text);
        text = out;
        hits.push(RuleHits {
            rule: rule.name,
            matches,
        });
    }

    Rewritten { text, hits }
}
