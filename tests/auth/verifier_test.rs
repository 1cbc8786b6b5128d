//! Checking queries against table permissions.

use junction::auth::{verify_query, QualifierContext, SqliteInspector, StaticSchema, DEFAULT_PLACEHOLDER};
use junction::Error;
use rusqlite::Connection;

const SALES_QUERY: &str = "SELECT s.event_time, SUM(price) AS sum_price FROM sales AS s";

fn schema() -> StaticSchema {
    StaticSchema::new()
        .with_table(Some("main"), "sales", ["event_time", "price"])
        .with_table(Some("main"), "users", ["id", "name"])
        .with_table(Some("main"), "accounts", ["id", "owner"])
}

fn context() -> QualifierContext {
    QualifierContext::new("postgres").with_schema("main")
}

fn verify(sql: &str, permissions: &[&str]) -> junction::Result<bool> {
    let permissions: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    verify_query(sql, &permissions, &schema(), &context(), DEFAULT_PLACEHOLDER)
}

#[test]
fn test_database_wide_permission() {
    assert!(verify(SALES_QUERY, &["SELECT * FROM postgres"]).unwrap());
}

#[test]
fn test_other_schema_denied() {
    assert!(!verify(SALES_QUERY, &["SELECT * FROM postgres.dev"]).unwrap());
}

#[test]
fn test_fully_qualified_permission() {
    assert!(verify(SALES_QUERY, &["SELECT * FROM postgres.null.main.sales"]).unwrap());
    assert!(!verify(SALES_QUERY, &["SELECT * FROM postgres.null.dev.sales"]).unwrap());
}

#[test]
fn test_every_permission_must_allow() {
    assert!(!verify(
        SALES_QUERY,
        &["SELECT * FROM postgres", "SELECT * FROM postgres.null.main.users"]
    )
    .unwrap());
    assert!(verify(
        SALES_QUERY,
        &["SELECT * FROM postgres", "SELECT * FROM postgres.null.main"]
    )
    .unwrap());
}

#[test]
fn test_every_statement_must_be_allowed() {
    let sql = "SELECT price FROM sales; SELECT name FROM users";
    assert!(!verify(sql, &["SELECT * FROM postgres.null.main.sales"]).unwrap());
    assert!(verify(
        sql,
        &["SELECT * FROM postgres.null.main.sales; SELECT * FROM postgres.null.main.users"]
    )
    .unwrap());
}

#[test]
fn test_joined_tables_need_one_alternative() {
    let sql = "SELECT s.price, u.name FROM sales AS s JOIN users AS u ON s.user_id = u.id";
    assert!(!verify(
        sql,
        &["SELECT * FROM postgres.null.main.sales; SELECT * FROM postgres.null.main.users"]
    )
    .unwrap());
    assert!(verify(
        sql,
        &["SELECT * FROM postgres.null.main.sales, postgres.null.main.users"]
    )
    .unwrap());
}

#[test]
fn test_subquery_tables_are_checked() {
    let sql = "SELECT t.price FROM (SELECT price FROM sales) AS t";
    assert!(verify(sql, &["SELECT * FROM postgres.null.main.sales"]).unwrap());
    assert!(!verify(sql, &["SELECT * FROM postgres.null.main.users"]).unwrap());
}

#[test]
fn test_no_permissions_denies() {
    assert!(!verify(SALES_QUERY, &[]).unwrap());
}

#[test]
fn test_qualification_failures_are_errors() {
    let err = verify("SELECT nope FROM sales", &["SELECT * FROM postgres"]).unwrap_err();
    assert!(matches!(err, Error::ColumnNotInAnyTable(_)));

    let err = verify("SELECT id FROM users, accounts", &["SELECT * FROM postgres"]).unwrap_err();
    assert!(matches!(err, Error::AmbiguousTableColumn(_)));

    let err = verify("SELECT price FROM missing", &["SELECT * FROM postgres"]).unwrap_err();
    assert!(matches!(err, Error::Introspection(_)));
}

#[test]
fn test_custom_placeholder() {
    let permissions = vec!["SELECT * FROM postgres.anything.main.sales".to_string()];
    let context = QualifierContext::new("postgres")
        .with_catalog("warehouse")
        .with_schema("main");
    assert!(verify_query(SALES_QUERY, &permissions, &schema(), &context, "anything").unwrap());
    assert!(!verify_query(SALES_QUERY, &permissions, &schema(), &context, "null").unwrap());
}

#[test]
fn test_sqlite_schema() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE sales (event_time TEXT, price REAL);")
        .unwrap();
    let inspector = SqliteInspector::from_connection(conn);
    let context = QualifierContext::new("postgres");
    let permissions = vec!["SELECT * FROM postgres.null.null.sales".to_string()];

    assert!(verify_query(
        "SELECT price FROM sales",
        &permissions,
        &inspector,
        &context,
        DEFAULT_PLACEHOLDER
    )
    .unwrap());

    let err = verify_query(
        "SELECT price FROM refunds",
        &permissions,
        &inspector,
        &context,
        DEFAULT_PLACEHOLDER,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Introspection(_)));
}

#[test]
fn test_non_query_statements_are_errors() {
    let permissions = ["SELECT * FROM postgres.null.main.sales"];
    for sql in [
        "DROP TABLE accounts",
        "INSERT INTO accounts VALUES (1, 'x')",
        "SELECT price FROM sales; DROP TABLE accounts",
    ] {
        let err = verify(sql, &permissions).unwrap_err();
        assert!(
            matches!(err, Error::NotImplemented(_)),
            "{sql}: unexpected error {err}"
        );
    }

    let err = verify("DROP TABLE accounts", &permissions).unwrap_err();
    assert_eq!(err.to_string(), "Unable to handle expression: DROP statement");
}
