//! Resolver behaviour over a small comments/users/countries catalog.

use std::collections::BTreeSet;

use junction::dag::{
    get_computable_databases, get_database_for_nodes, get_dimensions, get_node_referenced_columns,
    get_nodes_with_common_dimensions, get_nodes_with_dimension, ReferencedColumns,
};
use junction::model::{Column, ColumnType, Database, Node, NodeGraph, NodeType, Representation};
use junction::Error;

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
        Node::new("num_comments", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM comments")
            .with_parents(["comments"]),
        Node::new("avg_length", NodeType::Metric)
            .with_expression("SELECT AVG(LENGTH(body)) FROM comments")
            .with_parents(["comments"]),
        Node::new("logins", NodeType::Source)
            .with_columns(vec![
                Column::new("user_id", ColumnType::Int).with_dimension("users"),
                Column::new("ts", ColumnType::Datetime),
            ])
            .with_table(Representation::new(2, "logins")),
    ];
    NodeGraph::new(databases, nodes).unwrap()
}

fn names(nodes: &[&Node]) -> Vec<String> {
    nodes.iter().map(|n| n.name.clone()).collect()
}

#[test]
fn test_metric_references_parent_columns() {
    let graph = catalog();
    let metric = graph.node("avg_length").unwrap();
    let referenced = get_node_referenced_columns(&graph, metric).unwrap();
    assert_eq!(referenced.len(), 1);
    assert_eq!(referenced["comments"], BTreeSet::from(["body".to_string()]));

    let count = graph.node("num_comments").unwrap();
    assert!(get_node_referenced_columns(&graph, count).unwrap().is_empty());
}

#[test]
fn test_dimensions_follow_links_transitively() {
    let graph = catalog();
    let metric = graph.node("num_comments").unwrap();
    assert_eq!(
        get_dimensions(&graph, metric).unwrap(),
        vec![
            "comments.body",
            "comments.ds",
            "comments.id",
            "comments.user_id",
            "countries.code",
            "countries.name",
            "users.age",
            "users.country",
            "users.id",
        ]
    );
}

#[test]
fn test_dimensions_of_parentless_node_use_own_columns() {
    let graph = catalog();
    let countries = graph.node("countries").unwrap();
    assert_eq!(
        get_dimensions(&graph, countries).unwrap(),
        vec!["countries.code", "countries.name"]
    );
}

#[test]
fn test_computable_databases_respect_table_columns() {
    let graph = catalog();
    let metric = graph.node("avg_length").unwrap();
    // `body` only exists in the warehouse copy of comments
    let ids: Vec<i64> = get_computable_databases(&graph, metric, &BTreeSet::new())
        .unwrap()
        .iter()
        .map(|db| db.id)
        .collect();
    assert_eq!(ids, vec![1]);

    let count = graph.node("num_comments").unwrap();
    let ids: Vec<i64> = get_computable_databases(&graph, count, &BTreeSet::new())
        .unwrap()
        .iter()
        .map(|db| db.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_database_choice_prefers_cheapest() {
    let graph = catalog();
    let count = graph.node("num_comments").unwrap();
    let db = get_database_for_nodes(&graph, &[count], &ReferencedColumns::new(), None).unwrap();
    assert_eq!(db.name, "lake");
}

#[test]
fn test_database_choice_is_repeatable() {
    let graph = catalog();
    let count = graph.node("num_comments").unwrap();
    let users = graph.node("users").unwrap();
    let mut referenced = ReferencedColumns::new();
    referenced
        .entry("users".to_string())
        .or_default()
        .insert("country".to_string());

    let first = get_database_for_nodes(&graph, &[count, users], &referenced, None).unwrap();
    for _ in 0..10 {
        let again = get_database_for_nodes(&graph, &[count, users], &referenced, None).unwrap();
        assert_eq!(again.id, first.id);
    }
}

#[test]
fn test_database_choice_without_common_database() {
    let graph = catalog();
    let logins = graph.node("logins").unwrap();
    let countries = graph.node("countries").unwrap();
    let err = get_database_for_nodes(&graph, &[logins, countries], &ReferencedColumns::new(), None)
        .unwrap_err();
    assert!(matches!(err, Error::NoValidDatabase));
}

#[test]
fn test_database_choice_honours_requested_id() {
    let graph = catalog();
    let count = graph.node("num_comments").unwrap();
    let db = get_database_for_nodes(&graph, &[count], &ReferencedColumns::new(), Some(1)).unwrap();
    assert_eq!(db.name, "warehouse");

    let err =
        get_database_for_nodes(&graph, &[count], &ReferencedColumns::new(), Some(7)).unwrap_err();
    assert_eq!(err.to_string(), "Database ID 7 is not valid");
}

#[test]
fn test_nodes_with_dimension() {
    let graph = catalog();
    let nodes = get_nodes_with_dimension(&graph, "users").unwrap();
    assert_eq!(
        names(&nodes),
        vec!["avg_length", "comments", "logins", "num_comments"]
    );

    let nodes = get_nodes_with_dimension(&graph, "comments.ds").unwrap();
    assert_eq!(names(&nodes), vec!["avg_length", "comments", "num_comments"]);
}

#[test]
fn test_nodes_with_common_dimensions() {
    let graph = catalog();
    let nodes = get_nodes_with_common_dimensions(&graph, &["countries.name", "comments.ds"]).unwrap();
    assert_eq!(names(&nodes), vec!["avg_length", "comments", "num_comments"]);

    assert!(get_nodes_with_common_dimensions(&graph, &[]).unwrap().is_empty());
}

#[test]
fn test_graph_rejects_unknown_parent() {
    let err = NodeGraph::new(
        vec![],
        vec![Node::new("m", NodeType::Metric)
            .with_expression("SELECT COUNT(*) FROM missing")
            .with_parents(["missing"])],
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid graph: node m has unknown parent missing");
}

#[test]
fn test_graph_rejects_cycles() {
    let err = NodeGraph::new(
        vec![],
        vec![
            Node::new("a", NodeType::Transform).with_parents(["b"]),
            Node::new("b", NodeType::Transform).with_parents(["a"]),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidGraph(_)));
}

#[test]
fn test_graph_topological_order() {
    let graph = catalog();
    let order = names(&graph.topological_order());
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("comments") < position("num_comments"));
    assert!(position("comments") < position("avg_length"));
}

#[test]
fn test_aliased_parent_columns_pick_database() {
    let databases = vec![
        Database::new(1, "warehouse", "postgresql://warehouse/db").with_cost(10.0),
        Database::new(2, "lake", "duckdb://lake").with_cost(1.0),
    ];
    let nodes = vec![
        Node::new("comments", NodeType::Source)
            .with_columns(vec![
                Column::new("id", ColumnType::Int),
                Column::new("body", ColumnType::Str),
            ])
            .with_table(Representation::new(1, "comments").with_schema("public"))
            .with_table(Representation::new(2, "comments").with_columns(["id"])),
        Node::new("avg_length", NodeType::Metric)
            .with_expression("SELECT AVG(LENGTH(c.body)) FROM comments AS c")
            .with_parents(["comments"]),
    ];
    let graph = NodeGraph::new(databases, nodes).unwrap();
    let metric = graph.node("avg_length").unwrap();

    let referenced = get_node_referenced_columns(&graph, metric).unwrap();
    assert_eq!(referenced.keys().collect::<Vec<_>>(), vec!["comments"]);
    assert_eq!(referenced["comments"], BTreeSet::from(["body".to_string()]));

    let database = get_database_for_nodes(&graph, &[metric], &referenced, None).unwrap();
    assert_eq!(database.id, 1);
}

#[test]
fn test_unknown_qualifier_is_rejected() {
    let graph = catalog();
    let parents = vec![graph.node("comments").unwrap()];
    let err = junction::dag::get_referenced_columns_from_sql(
        "SELECT MAX(x.ds) FROM comments AS c",
        &parents,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(ref q) if q == "x"));
}
