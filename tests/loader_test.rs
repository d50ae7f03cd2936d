//! Integration tests for rewriting, planning and loading dumps into DuckDB.

use northwind_rfm::parser::{classify_statements, create_table_name, insert_table_name};
use northwind_rfm::rewrite::rewrite;
use northwind_rfm::store::{load_dump, LoadError, LoadPlan, Phase, Store};
use tempfile::TempDir;

const NORTHWIND_MINI: &str = include_str!("fixtures/northwind_mini.sql");

fn plan_for(dump: &str) -> LoadPlan {
    LoadPlan::build(&classify_statements(&rewrite(dump))).unwrap()
}

// =============================================================================
// Plan Tests
// =============================================================================

#[test]
fn test_fixture_plan_counts() {
    let classified = classify_statements(&rewrite(NORTHWIND_MINI));
    assert_eq!(classified.creates.len(), 4);
    assert_eq!(classified.inserts.len(), 12);
    // The two ALTER TABLE constraints
    assert_eq!(classified.discarded, 2);

    let plan = LoadPlan::build(&classified).unwrap();
    assert_eq!(plan.count(Phase::Drop), 4);
    assert_eq!(plan.count(Phase::Create), 4);
    assert_eq!(plan.count(Phase::Insert), 12);
}

#[test]
fn test_one_drop_per_created_table() {
    let dumps = [
        NORTHWIND_MINI,
        "CREATE TABLE a (x int);",
        "CREATE TABLE a (x int); CREATE TABLE b (y int); INSERT INTO a VALUES (1);",
        "INSERT INTO a VALUES (1);",
        "",
    ];

    for dump in dumps {
        let classified = classify_statements(&rewrite(dump));
        let plan = LoadPlan::build(&classified).unwrap();
        let created: Vec<&str> = classified
            .creates
            .iter()
            .map(|s| create_table_name(s).unwrap())
            .collect();

        assert_eq!(plan.count(Phase::Drop), classified.creates.len());
        for drop in plan.drops() {
            let table = drop.table.as_deref().unwrap();
            assert_eq!(
                created.iter().filter(|t| **t == table).count(),
                1,
                "drop for {} should match exactly one create",
                table
            );
            assert_eq!(drop.sql, format!("DROP TABLE IF EXISTS {}", table));
        }
    }
}

#[test]
fn test_drop_then_create_then_insert_per_table() {
    // Inserts interleaved with creates in the dump
    let dump = "CREATE TABLE a (x int);\n\
                INSERT INTO a VALUES (1);\n\
                CREATE TABLE b (y int);\n\
                INSERT INTO b VALUES (2);\n\
                INSERT INTO a VALUES (3);\n";
    let plan = plan_for(dump);
    let statements = plan.statements();

    for table in ["a", "b"] {
        let position = |phase: Phase| {
            statements
                .iter()
                .position(|s| s.phase == phase && s.table.as_deref() == Some(table))
                .unwrap()
        };
        let drop = position(Phase::Drop);
        let create = position(Phase::Create);
        assert!(drop < create);

        for (i, stmt) in statements.iter().enumerate() {
            if stmt.phase == Phase::Insert && insert_table_name(&stmt.sql) == Some(table) {
                assert!(create < i, "insert into {} ran before its create", table);
            }
        }
    }
}

#[test]
fn test_missing_table_name_aborts_before_execution() {
    let store = Store::open_in_memory().unwrap();
    let dump = "CREATE TABLE a (x int);\nCREATE TABLE (y int);\nINSERT INTO a VALUES (1);";

    let err = load_dump(&store, dump, false).unwrap_err();
    assert!(matches!(err, LoadError::MissingTableName { .. }));
    assert!(store.list_tables().unwrap().is_empty());
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_fixture() {
    let store = Store::open_in_memory().unwrap();
    let report = load_dump(&store, NORTHWIND_MINI, false).unwrap();

    assert!(!report.has_failures(), "failures: {:?}", report.failures);
    assert_eq!(report.succeeded.drop, 4);
    assert_eq!(report.succeeded.create, 4);
    assert_eq!(report.succeeded.insert, 12);
    assert_eq!(report.discarded, 2);

    assert_eq!(
        store.list_tables().unwrap(),
        vec!["categories", "customers", "order_details", "orders"]
    );
    assert_eq!(store.count_rows("orders").unwrap(), 4);
    assert_eq!(store.count_rows("order_details").unwrap(), 3);
}

#[test]
fn test_load_fixture_values() {
    let store = Store::open_in_memory().unwrap();
    load_dump(&store, NORTHWIND_MINI, false).unwrap();

    // Semicolon inside the description survived splitting
    let result = store
        .query("SELECT description, picture FROM categories WHERE category_id = 1")
        .unwrap();
    assert_eq!(
        result.rows[0][0],
        "Soft drinks; coffees, teas, beers, and ales"
    );
    assert_eq!(result.rows[0][1], "NULL");

    let result = store
        .query("SELECT company_name FROM customers WHERE customer_id = 'BONAP'")
        .unwrap();
    assert_eq!(result.rows[0][0], "Bon app'");
}

#[test]
fn test_failed_insert_does_not_block_later_inserts() {
    let store = Store::open_in_memory().unwrap();
    let dump = "CREATE TABLE a (x int, y int);\n\
                INSERT INTO a VALUES (1, 1);\n\
                INSERT INTO a VALUES (2);\n\
                INSERT INTO missing VALUES (3, 3);\n\
                INSERT INTO a VALUES (4, 4);\n";

    let report = load_dump(&store, dump, false).unwrap();

    assert_eq!(report.succeeded.insert, 2);
    assert_eq!(report.failed.insert, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].statement, "INSERT INTO a VALUES (2)");
    assert_eq!(report.failures[1].statement, "INSERT INTO missing VALUES (3, 3)");
    assert!(report.failures.iter().all(|f| f.phase == Phase::Insert));

    let result = store.query("SELECT x FROM a ORDER BY x").unwrap();
    let xs: Vec<&str> = result.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(xs, vec!["1", "4"]);
}

#[test]
fn test_comment_marker_in_literal_does_not_swallow_later_inserts() {
    let store = Store::open_in_memory().unwrap();
    let dump = "CREATE TABLE t (id int, note text);\n\
                INSERT INTO t VALUES (1, 'a--b');\n\
                INSERT INTO t VALUES (2, 'ok');\n\
                INSERT INTO t VALUES (3, 'x');\n\
                INSERT INTO t VALUES (4, 'y');\n";

    let report = load_dump(&store, dump, false).unwrap();

    assert!(!report.has_failures(), "failures: {:?}", report.failures);
    assert_eq!(report.succeeded.insert, 4);
    assert_eq!(store.count_rows("t").unwrap(), 4);

    let result = store.query("SELECT note FROM t WHERE id = 1").unwrap();
    assert_eq!(result.rows[0][0], "a--b");
}

#[test]
fn test_failed_create_reported() {
    let store = Store::open_in_memory().unwrap();
    let dump = "CREATE TABLE a (x nosuchtype);\nCREATE TABLE b (y int);\nINSERT INTO b VALUES (1);";

    let report = load_dump(&store, dump, false).unwrap();

    assert_eq!(report.failed.create, 1);
    assert_eq!(report.succeeded.create, 1);
    assert_eq!(report.succeeded.insert, 1);
    assert!(!store.table_exists("a"));
    assert!(store.table_exists("b"));
}

#[test]
fn test_reload_replaces_existing_tables() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("processed").join("northwind.duckdb");

    {
        let store = Store::open(&db_path).unwrap();
        load_dump(&store, NORTHWIND_MINI, false).unwrap();
    }
    assert!(db_path.exists());

    let store = Store::open(&db_path).unwrap();
    let report = load_dump(&store, NORTHWIND_MINI, false).unwrap();

    assert!(!report.has_failures(), "failures: {:?}", report.failures);
    // Dropped and recreated, not appended to
    assert_eq!(store.count_rows("orders").unwrap(), 4);
    assert_eq!(store.count_rows("customers").unwrap(), 3);
}

#[test]
fn test_report_serializes() {
    let store = Store::open_in_memory().unwrap();
    let report = load_dump(&store, "CREATE TABLE a (x int);\nINSERT INTO a VALUES ('oops');", false)
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["succeeded"]["create"], 1);
    assert_eq!(json["failed"]["insert"], 1);
    assert_eq!(json["failures"][0]["phase"], "insert");
}
