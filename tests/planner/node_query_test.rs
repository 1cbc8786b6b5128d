//! Compiling nodes grouped by and filtered on dimensions.

use junction::model::{Column, ColumnType, Database, Node, NodeGraph, NodeType, Representation};
use junction::planner::get_query_for_node;
use junction::Error;

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// One metric over one source, materialized in a single database.
fn single_parent() -> NodeGraph {
    let databases = vec![Database::new(1, "warehouse", "postgresql://warehouse/db")];
    let nodes = vec![
        Node::new("parent", NodeType::Source)
            .with_columns(vec![
                Column::new("ds", ColumnType::Str),
                Column::new("user_id", ColumnType::Int),
            ])
            .with_table(Representation::new(1, "parent").with_columns(["ds", "user_id"])),
        Node::new("metric_a", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM parent")
            .with_parents(["parent"]),
    ];
    NodeGraph::new(databases, nodes).unwrap()
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
            ])
            .with_table(Representation::new(1, "comments").with_schema("public"))
            .with_table(Representation::new(2, "comments").with_columns(["id", "user_id", "ds"])),
        Node::new("num_comments", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM comments")
            .with_parents(["comments"]),
        Node::new("recent_comments", NodeType::Transform)
            .with_expression("SELECT id, user_id FROM comments WHERE id > 10")
            .with_parents(["comments"])
            .with_columns(vec![
                Column::new("id", ColumnType::Int),
                Column::new("user_id", ColumnType::Int).with_dimension("users"),
            ]),
        Node::new("num_recent", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM recent_comments")
            .with_parents(["recent_comments"]),
        Node::new("oldest", NodeType::Metric)
            .with_expression("SELECT MIN(c.id) FROM comments AS c")
            .with_parents(["comments"]),
    ];
    NodeGraph::new(databases, nodes).unwrap()
}

#[test]
fn test_grouped_and_filtered_metric() {
    let graph = single_parent();
    let metric = graph.node("metric_a").unwrap();
    let created = get_query_for_node(
        &graph,
        metric,
        &strings(&["parent.ds"]),
        &strings(&["parent.user_id>1"]),
        None,
    )
    .unwrap();

    assert_eq!(created.database_id, 1);
    insta::assert_snapshot!(created.submitted_query, @r"
    SELECT
      COUNT(*),
      parent.ds
    FROM parent
    WHERE parent.user_id > 1
    GROUP BY parent.ds
    ");
}

#[test]
fn test_invalid_dimension_is_named() {
    let graph = single_parent();
    let metric = graph.node("metric_a").unwrap();
    let err = get_query_for_node(&graph, metric, &strings(&["parent.nope"]), &[], None)
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid dimension: parent.nope");

    let err = get_query_for_node(
        &graph,
        metric,
        &strings(&["zzz.a"]),
        &strings(&["aaa.b=1"]),
        None,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid dimensions: aaa.b, zzz.a");
}

#[test]
fn test_malformed_filters() {
    let graph = single_parent();
    let metric = graph.node("metric_a").unwrap();
    let run = |filter: &str| {
        get_query_for_node(&graph, metric, &[], &strings(&[filter]), None).unwrap_err()
    };

    assert!(matches!(run("parent.ds"), Error::InvalidFilter(_)));
    assert!(matches!(run("parent.user_id>>1"), Error::InvalidValue(_)));
    assert!(matches!(run("parent.user_id=abc"), Error::InvalidValue(_)));
}

#[test]
fn test_no_dimensions_reads_materialization() {
    let graph = catalog();
    let comments = graph.node("comments").unwrap();
    let created = get_query_for_node(&graph, comments, &[], &[], None).unwrap();
    assert_eq!(created.database_id, 2);
    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT id, user_id, ds FROM comments"
    );

    let metric = graph.node("num_comments").unwrap();
    let created = get_query_for_node(&graph, metric, &[], &[], None).unwrap();
    assert_eq!(created.database_id, 2);
    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT COUNT(*) FROM comments"
    );
}

#[test]
fn test_dimension_joined_through_link() {
    let graph = catalog();
    let metric = graph.node("num_comments").unwrap();
    let created = get_query_for_node(
        &graph,
        metric,
        &strings(&["users.country"]),
        &strings(&["users.age>=18"]),
        None,
    )
    .unwrap();

    assert_eq!(created.database_id, 2);
    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT COUNT(*), users.country FROM comments \
         INNER JOIN users ON comments.user_id = users.id \
         WHERE users.age >= 18 GROUP BY users.country"
    );
}

#[test]
fn test_schema_qualified_tables_keep_node_names() {
    let graph = catalog();
    let metric = graph.node("num_comments").unwrap();
    let created =
        get_query_for_node(&graph, metric, &strings(&["users.country"]), &[], Some(1)).unwrap();

    assert_eq!(created.database_id, 1);
    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT COUNT(*), users.country FROM public.comments AS comments \
         INNER JOIN public.dim_users AS users ON comments.user_id = users.id \
         GROUP BY users.country"
    );
}

#[test]
fn test_multi_hop_dimension_picks_capable_database() {
    let graph = catalog();
    let metric = graph.node("num_comments").unwrap();
    let created = get_query_for_node(
        &graph,
        metric,
        &strings(&["countries.name"]),
        &strings(&["countries.code='BR'"]),
        None,
    )
    .unwrap();

    // countries only lives in the warehouse
    assert_eq!(created.database_id, 1);
    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT COUNT(*), countries.name FROM public.comments AS comments \
         INNER JOIN public.dim_users AS users ON comments.user_id = users.id \
         INNER JOIN public.countries AS countries ON users.country = countries.code \
         WHERE countries.code = 'BR' GROUP BY countries.name"
    );
}

#[test]
fn test_parent_alias_is_kept() {
    let graph = catalog();
    let metric = graph.node("oldest").unwrap();
    let created = get_query_for_node(
        &graph,
        metric,
        &strings(&["comments.ds"]),
        &strings(&["users.age<30"]),
        Some(1),
    )
    .unwrap();

    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT MIN(c.id), c.ds FROM public.comments AS c \
         INNER JOIN public.dim_users AS users ON c.user_id = users.id \
         WHERE users.age < 30 GROUP BY c.ds"
    );
}

#[test]
fn test_transform_parent_becomes_derived_table() {
    let graph = catalog();
    let metric = graph.node("num_recent").unwrap();
    let created =
        get_query_for_node(&graph, metric, &strings(&["users.country"]), &[], Some(1)).unwrap();
    let sql = normalize(&created.submitted_query);

    assert!(sql.starts_with("SELECT COUNT(*), users.country FROM ( SELECT comments.id, comments.user_id"));
    assert!(sql.contains("FROM public.comments AS comments WHERE comments.id > 10 ) AS recent_comments"));
    assert!(sql.ends_with(
        "INNER JOIN public.dim_users AS users ON recent_comments.user_id = users.id \
         GROUP BY users.country"
    ));
}

#[test]
fn test_requested_database_must_be_capable() {
    let graph = catalog();
    let metric = graph.node("num_comments").unwrap();

    let err = get_query_for_node(&graph, metric, &strings(&["countries.name"]), &[], Some(2))
        .unwrap_err();
    assert_eq!(err.to_string(), "Database ID 2 is not valid");

    let err = get_query_for_node(&graph, metric, &[], &[], Some(99)).unwrap_err();
    assert!(matches!(err, Error::InvalidDatabaseId(99)));
}

#[test]
fn test_dimension_joins_follow_their_from_entry() {
    let databases = vec![Database::new(1, "warehouse", "postgresql://warehouse/db")];
    let nodes = vec![
        Node::new("users", NodeType::Dimension)
            .with_columns(vec![
                Column::new("id", ColumnType::Int),
                Column::new("country", ColumnType::Str),
            ])
            .with_table(Representation::new(1, "users")),
        Node::new("a", NodeType::Source)
            .with_columns(vec![Column::new("ds", ColumnType::Str)])
            .with_table(Representation::new(1, "a")),
        Node::new("b", NodeType::Source)
            .with_columns(vec![
                Column::new("bds", ColumnType::Str),
                Column::new("user_id", ColumnType::Int).with_dimension("users"),
            ])
            .with_table(Representation::new(1, "b")),
        Node::new("paired", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM a, b WHERE a.ds = b.bds")
            .with_parents(["a", "b"]),
    ];
    let graph = NodeGraph::new(databases, nodes).unwrap();
    let metric = graph.node("paired").unwrap();
    let created =
        get_query_for_node(&graph, metric, &strings(&["users.country"]), &[], None).unwrap();

    assert_eq!(
        normalize(&created.submitted_query),
        "SELECT COUNT(*), users.country FROM a, b \
         INNER JOIN users ON b.user_id = users.id \
         WHERE a.ds = b.bds GROUP BY users.country"
    );
}
