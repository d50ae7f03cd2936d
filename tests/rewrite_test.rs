//! Property-style tests for the dialect rewriter and statement splitter.

use northwind_rfm::parser::{classify_statements, split_statements};
use northwind_rfm::rewrite::{rewrite, rewrite_with_stats};

const NORTHWIND_MINI: &str = include_str!("fixtures/northwind_mini.sql");

#[test]
fn test_varchar_size_preserved_verbatim() {
    for n in ["0", "1", "5", "15", "40", "255", "65535", "007", "18446744073709551616"] {
        let input = format!("name character varying({}) NOT NULL", n);
        assert_eq!(rewrite(&input), format!("name VARCHAR({}) NOT NULL", n));
    }
}

#[test]
fn test_rewrite_idempotent_on_clean_input() {
    let clean = [
        "CREATE TABLE a (x VARCHAR(10), y BLOB);",
        "INSERT INTO a VALUES ('one', NULL);\nINSERT INTO a VALUES ('two', NULL);",
        "UPDATE a SET x = 'z';",
        "",
    ];
    for input in clean {
        let once = rewrite(input);
        assert_eq!(once, input);
        assert_eq!(rewrite(&once), once);
    }
}

#[test]
fn test_rewrite_idempotent_on_fixture() {
    let once = rewrite(NORTHWIND_MINI);
    assert_eq!(rewrite(&once), once);
    assert_eq!(rewrite_with_stats(&once).total_matches(), 0);
}

#[test]
fn test_no_hex_marker_survives() {
    let inputs = [
        r"INSERT INTO t VALUES ('\x00ff');",
        r"INSERT INTO t VALUES ('\x');",
        r"INSERT INTO t VALUES ('\xDEADbeef', '\x01');",
        r"INSERT INTO t VALUES ('pre\xfix');",
        r"\x\x\x",
    ];
    for input in inputs {
        let out = rewrite(input);
        assert!(!out.contains(r"\x"), "{:?} -> {:?}", input, out);
        assert!(out.contains("NULL"));
    }
}

#[test]
fn test_fixture_is_clean_after_rewrite() {
    let out = rewrite(NORTHWIND_MINI);
    assert!(!out.contains("--"));
    assert!(!out.contains("/*"));
    assert!(!out.contains("character varying"));
    assert!(!out.contains("bytea"));
    assert!(!out.contains(" real"));
    assert!(!out.contains(r"\x"));
    assert!(!out.contains("pg_catalog"));
    assert!(!out.lines().any(|l| l.trim_start().starts_with("SET ")));
}

#[test]
fn test_rule_stats_for_fixture() {
    let result = rewrite_with_stats(NORTHWIND_MINI);
    let hits = |rule: &str| {
        result
            .hits
            .iter()
            .find(|h| h.rule == rule)
            .map(|h| h.matches)
            .unwrap()
    };
    assert_eq!(hits("session-settings"), 7);
    assert_eq!(hits("search-path-reset"), 1);
    assert_eq!(hits("comments"), 25);
    assert_eq!(hits("real"), 2);
    assert_eq!(hits("bytea"), 1);
    assert_eq!(hits("hex-literals"), 2);
    assert_eq!(hits("hex-markers"), 0);
}

#[test]
fn test_split_respects_quoted_semicolons() {
    let sql = "INSERT INTO t VALUES ('a;b');\nINSERT INTO \"odd;name\" VALUES (1);\nINSERT INTO t VALUES ('it''s; fine');";
    let stmts = split_statements(sql);
    assert_eq!(
        stmts,
        vec![
            "INSERT INTO t VALUES ('a;b')",
            "INSERT INTO \"odd;name\" VALUES (1)",
            "INSERT INTO t VALUES ('it''s; fine')",
        ]
    );
}

#[test]
fn test_classification_is_case_sensitive() {
    let classified = classify_statements(
        "create table a (x int);\nCREATE TABLE b (x int);\ninsert into b values (1);\nINSERT INTO b VALUES (2);",
    );
    assert_eq!(classified.creates, vec!["CREATE TABLE b (x int)"]);
    assert_eq!(classified.inserts, vec!["INSERT INTO b VALUES (2)"]);
    assert_eq!(classified.discarded, 2);
}

#[test]
fn test_comment_markers_in_data_keep_statements_apart() {
    let dump = "INSERT INTO t VALUES (1, 'a--b');\n\
                INSERT INTO t VALUES (2, 'x/*y');\n\
                INSERT INTO t VALUES (3, 'ok'); -- trailing\n";
    let classified = classify_statements(&rewrite(dump));
    assert_eq!(
        classified.inserts,
        vec![
            "INSERT INTO t VALUES (1, 'a--b')",
            "INSERT INTO t VALUES (2, 'x/*y')",
            "INSERT INTO t VALUES (3, 'ok')",
        ]
    );
}
