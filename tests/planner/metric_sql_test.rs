//! Rewriting queries over the virtual `metrics` table.

use junction::model::{Column, ColumnType, Database, Node, NodeGraph, NodeType, Representation};
use junction::planner::get_query_for_sql;
use junction::Error;

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn catalog() -> NodeGraph {
    let databases = vec![
        Database::new(1, "warehouse", "postgresql://warehouse/db").with_cost(10.0),
        Database::new(2, "lake", "duckdb://lake").with_cost(1.0),
    ];
    let nodes = vec![
        Node::new("countries", NodeType::Dimension)
            .with_columns(vec![
                Column::new("code", ColumnType::Str),
                Column::new("name", ColumnType::Str),
            ])
            .with_table(Representation::new(1, "countries").with_schema("public")),
        Node::new("users", NodeType::Dimension)
            .with_columns(vec![
                Column::new("id", ColumnType::Int),
                Column::new("age", ColumnType::Int),
                Column::new("country", ColumnType::Str)
                    .with_dimension("countries")
                    .with_dimension_column("code"),
            ])
            .with_table(Representation::new(1, "dim_users").with_schema("public"))
            .with_table(Representation::new(2, "users").with_columns(["id", "age", "country"])),
        Node::new("comments", NodeType::Source)
            .with_columns(vec![
                Column::new("id", ColumnType::Int),
                Column::new("user_id", ColumnType::Int).with_dimension("users"),
                Column::new("ds", ColumnType::Str),
                Column::new("body", ColumnType::Str),
            ])
            .with_table(Representation::new(1, "comments").with_schema("public"))
            .with_table(Representation::new(2, "comments").with_columns(["id", "user_id", "ds"])),
        Node::new("logins", NodeType::Source)
            .with_columns(vec![
                Column::new("user_id", ColumnType::Int).with_dimension("users"),
                Column::new("ts", ColumnType::Datetime),
            ])
            .with_table(Representation::new(2, "logins")),
        Node::new("num_comments", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM comments")
            .with_parents(["comments"]),
        Node::new("avg_length", NodeType::Metric)
            .with_expression("SELECT AVG(LENGTH(body)) FROM comments")
            .with_parents(["comments"]),
        Node::new("num_logins", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM logins")
            .with_parents(["logins"]),
    ];
    NodeGraph::new(databases, nodes).unwrap()
}

fn rewrite(sql: &str, database_id: Option<i64>) -> (i64, String) {
    let created = get_query_for_sql(&catalog(), sql, database_id).unwrap();
    (created.database_id, normalize(&created.submitted_query))
}

fn rewrite_err(sql: &str) -> Error {
    get_query_for_sql(&catalog(), sql, None).unwrap_err()
}

#[test]
fn test_metric_with_joined_dimension() {
    let (db, sql) = rewrite(
        "SELECT num_comments, users.country FROM metrics GROUP BY users.country",
        None,
    );
    assert_eq!(db, 2);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS num_comments, users.country FROM comments \
         INNER JOIN users ON comments.user_id = users.id GROUP BY users.country"
    );
}

#[test]
fn test_metric_on_requested_database() {
    let (db, sql) = rewrite(
        "SELECT num_comments, users.country FROM metrics \
         WHERE users.age > 18 GROUP BY users.country",
        Some(1),
    );
    assert_eq!(db, 1);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS num_comments, users.country FROM public.comments AS comments \
         INNER JOIN public.dim_users AS users ON comments.user_id = users.id \
         WHERE users.age > 18 GROUP BY users.country"
    );
}

#[test]
fn test_metric_alias_and_parent_column() {
    let (_, sql) = rewrite(
        "SELECT num_comments AS n, comments.ds FROM metrics GROUP BY comments.ds",
        None,
    );
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS n, comments.ds FROM comments GROUP BY comments.ds"
    );
}

#[test]
fn test_metrics_sharing_parents() {
    let (db, sql) = rewrite("SELECT num_comments, avg_length FROM metrics", None);
    // only the warehouse copy of comments has `body`
    assert_eq!(db, 1);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS num_comments, AVG(LENGTH(comments.body)) AS avg_length \
         FROM public.comments AS comments"
    );
}

#[test]
fn test_having_and_order_by_use_aggregates() {
    let (_, sql) = rewrite(
        "SELECT num_comments, users.country FROM metrics GROUP BY users.country \
         HAVING num_comments > 10 ORDER BY num_comments DESC LIMIT 5",
        None,
    );
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS num_comments, users.country FROM comments \
         INNER JOIN users ON comments.user_id = users.id GROUP BY users.country \
         HAVING COUNT(*) > 10 ORDER BY COUNT(*) DESC LIMIT 5"
    );
}

#[test]
fn test_dimension_only_query() {
    let (db, sql) = rewrite(
        "SELECT users.country FROM metrics GROUP BY users.country",
        None,
    );
    assert_eq!(db, 2);
    assert_eq!(sql, "SELECT users.country FROM users GROUP BY users.country");

    let (_, sql) = rewrite("SELECT users.country FROM metrics", Some(1));
    assert_eq!(sql, "SELECT users.country FROM public.dim_users AS users");
}

#[test]
fn test_constant_query_uses_cheapest_database() {
    let (db, sql) = rewrite("SELECT 1 FROM metrics", None);
    assert_eq!(db, 2);
    assert_eq!(sql, "SELECT 1");
}

#[test]
fn test_metrics_with_different_parents() {
    let err = rewrite_err("SELECT num_comments, num_logins FROM metrics");
    assert!(matches!(err, Error::ParentMismatch));
}

#[test]
fn test_non_metric_node_rejected() {
    let err = rewrite_err("SELECT comments FROM metrics");
    assert_eq!(err.to_string(), "Not a valid metric: comments");
}

#[test]
fn test_unknown_identifiers() {
    let err = rewrite_err("SELECT num_comments, nope.id FROM metrics");
    assert_eq!(err.to_string(), "Invalid identifier: nope");

    let err = rewrite_err("SELECT num_comments FROM metrics WHERE foo > 1");
    assert_eq!(err.to_string(), "Invalid identifier: foo");
}

#[test]
fn test_unreachable_dimension_columns() {
    let err = rewrite_err("SELECT num_comments, comments.nope FROM metrics");
    assert_eq!(err.to_string(), "Invalid dimension: comments.nope");

    let err = rewrite_err("SELECT num_comments, logins.ts FROM metrics");
    assert_eq!(err.to_string(), "Invalid dimension: logins.ts");
}

#[test]
fn test_several_dimensions_without_metric() {
    let err = rewrite_err("SELECT users.country, countries.name FROM metrics");
    assert!(matches!(err, Error::MultipleDimensions));
}

#[test]
fn test_unsupported_shapes() {
    for sql in [
        "SELECT num_comments FROM comments",
        "SELECT * FROM metrics",
        "WITH x AS (SELECT 1) SELECT num_comments FROM metrics",
    ] {
        let err = rewrite_err(sql);
        assert!(
            matches!(err, Error::NotImplemented(_)),
            "{sql}: unexpected error {err}"
        );
    }
}

#[test]
fn test_quoted_node_references() {
    let (db, sql) = rewrite(
        "SELECT \"num_comments\", \"users.country\" FROM metrics \
         WHERE \"comments.ds\" > '2024-01-01' GROUP BY \"users.country\"",
        None,
    );
    assert_eq!(db, 2);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS num_comments, users.country FROM comments \
         INNER JOIN users ON comments.user_id = users.id \
         WHERE comments.ds > '2024-01-01' GROUP BY users.country"
    );

    let (_, sql) = rewrite("SELECT \"users.country\" FROM metrics", None);
    assert_eq!(sql, "SELECT users.country FROM users");

    let err = rewrite_err("SELECT \"num_comments\", \"nope.id\" FROM metrics");
    assert_eq!(err.to_string(), "Invalid identifier: nope");
}
