//! Loading the catalog from TOML and compiling against it.

use std::env;
use std::fs;

use rusqlite::Connection;

use junction::auth::{verify_query, QualifierContext, SchemaInspector};
use junction::config::{Settings, SettingsError};
use junction::Error;
use junction::model::{ColumnType, NodeType};
use junction::planner::get_query_for_node;
use junction::sql::Dialect;

const CATALOG: &str = r#"
[[databases]]
id = 1
name = "warehouse"
uri = "postgresql://${JUNCTION_SETTINGS_TEST_HOST}/analytics"
cost = 10.0

[[databases]]
id = 2
name = "lake"
uri = "duckdb:///data/lake.duckdb"
cost = 1.0
read_only = true

[[nodes]]
name = "users"
type = "dimension"
[[nodes.columns]]
name = "id"
type = "int"
[[nodes.columns]]
name = "country"
type = "str"
[[nodes.tables]]
database = 1
schema = "public"
table = "dim_users"

[[nodes]]
name = "comments"
type = "source"
description = "One row per comment"
[[nodes.columns]]
name = "id"
type = "int"
[[nodes.columns]]
name = "user_id"
type = "int"
dimension = "users"
[[nodes.tables]]
database = 1
schema = "public"
table = "comments"
[[nodes.tables]]
database = 2
table = "comments"
columns = ["id", "user_id"]

[[nodes]]
name = "num_comments"
type = "metric"
expression = "SELECT COUNT(*) FROM comments"
parents = ["comments"]

[[schemas]]
schema = "public"
table = "comments"
columns = ["id", "user_id", "body"]

[verifier]
wildcard = "any"
"#;

fn load() -> Settings {
    env::set_var("JUNCTION_SETTINGS_TEST_HOST", "db.internal:5432");
    Settings::from_toml(CATALOG).unwrap()
}

#[test]
fn test_full_catalog_parses() {
    let settings = load();

    assert_eq!(settings.databases.len(), 2);
    assert_eq!(
        settings.databases[0].uri,
        "postgresql://db.internal:5432/analytics"
    );
    assert_eq!(settings.databases[0].dialect(), Dialect::Postgres);
    assert_eq!(settings.databases[1].dialect(), Dialect::DuckDb);
    assert!(settings.databases[1].read_only);

    assert_eq!(settings.nodes.len(), 3);
    let comments = &settings.nodes[1];
    assert_eq!(comments.node_type, NodeType::Source);
    assert_eq!(comments.description, "One row per comment");
    assert_eq!(comments.columns[1].col_type, ColumnType::Int);
    assert_eq!(comments.columns[1].dimension.as_deref(), Some("users"));
    assert_eq!(comments.tables[0].schema.as_deref(), Some("public"));
    assert_eq!(comments.tables[1].columns, vec!["id", "user_id"]);

    assert_eq!(settings.verifier.wildcard, "any");
}

#[test]
fn test_catalog_compiles_queries() {
    let settings = load();
    let graph = settings.build_graph().unwrap();
    let metric = graph.node("num_comments").unwrap();

    let created = get_query_for_node(&graph, metric, &["users.country".to_string()], &[], None)
        .unwrap();
    // users only lives in the warehouse
    assert_eq!(created.database_id, 1);
    let sql = created
        .submitted_query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    assert!(sql.contains("INNER JOIN public.dim_users AS users ON comments.user_id = users.id"));
}

#[test]
fn test_catalog_feeds_verifier() {
    let settings = load();
    let inspector = settings.schema_inspector();
    assert_eq!(
        inspector.columns(Some("public"), "comments").unwrap(),
        vec!["id", "user_id", "body"]
    );

    let context = QualifierContext::new("warehouse").with_schema("public");
    let allowed = verify_query(
        "SELECT body FROM comments",
        &["SELECT * FROM warehouse.any.public".to_string()],
        &inspector,
        &context,
        &settings.verifier.wildcard,
    )
    .unwrap();
    assert!(allowed);
}

#[test]
fn test_unknown_parent_is_invalid_config() {
    let toml = r#"
[[nodes]]
name = "orphan"
type = "metric"
expression = "SELECT COUNT(*) FROM nowhere"
parents = ["nowhere"]
"#;
    let err = Settings::from_toml(toml).unwrap().build_graph().unwrap_err();
    assert!(matches!(err, SettingsError::InvalidConfig(_)));
    assert!(err.to_string().contains("unknown parent nowhere"));
}

#[test]
fn test_unknown_database_is_invalid_config() {
    let toml = r#"
[[nodes]]
name = "events"
type = "source"
[[nodes.tables]]
database = 9
table = "events"
"#;
    let err = Settings::from_toml(toml).unwrap().build_graph().unwrap_err();
    assert!(matches!(err, SettingsError::InvalidConfig(_)));
}

#[test]
fn test_missing_env_var_in_uri() {
    let toml = r#"
[[databases]]
id = 1
name = "warehouse"
uri = "postgresql://${JUNCTION_SETTINGS_TEST_UNSET}/db"
"#;
    let err = Settings::from_toml(toml).unwrap_err();
    assert!(
        matches!(err, SettingsError::MissingEnvVar(ref v) if v == "JUNCTION_SETTINGS_TEST_UNSET")
    );
}

#[test]
fn test_malformed_toml() {
    let err = Settings::from_toml("[[nodes]]\nname = ").unwrap_err();
    assert!(matches!(err, SettingsError::ParseError(_)));
}

#[test]
fn test_from_file() {
    let path = env::temp_dir().join(format!("junction-settings-{}.toml", std::process::id()));
    fs::write(
        &path,
        "[[databases]]\nid = 3\nname = \"local\"\nuri = \"sqlite:///tmp/x.db\"\n",
    )
    .unwrap();
    let settings = Settings::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(settings.databases[0].id, 3);
    assert_eq!(settings.databases[0].dialect(), Dialect::Sqlite);

    let missing = Settings::from_file(&path).unwrap_err();
    assert!(matches!(missing, SettingsError::FileNotFound(_)));
}

#[test]
fn test_verifier_reads_sqlite_schema() {
    let path = env::temp_dir().join(format!("junction-schema-{}.db", std::process::id()));
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE refunds (id INTEGER, amount REAL);")
        .unwrap();
    drop(conn);

    let toml = format!("[verifier]\nsqlite = {:?}\n", path.display().to_string());
    let settings = Settings::from_toml(&toml).unwrap();
    assert_eq!(settings.verifier.sqlite.as_deref(), Some(path.as_path()));
    assert_eq!(settings.verifier.wildcard, "null");

    let inspector = settings.verifier_inspector().unwrap();
    let context = QualifierContext::new("lake");
    let allowed = verify_query(
        "SELECT amount FROM refunds",
        &["SELECT * FROM lake.null.null.refunds".to_string()],
        inspector.as_ref(),
        &context,
        &settings.verifier.wildcard,
    )
    .unwrap();
    fs::remove_file(&path).unwrap();
    assert!(allowed);

    let missing = settings.verifier_inspector().err().unwrap();
    assert!(matches!(missing, Error::Sqlite(_)));
}

#[test]
fn test_verifier_defaults_to_declared_schemas() {
    let settings = load();
    assert!(settings.verifier.sqlite.is_none());
    let inspector = settings.verifier_inspector().unwrap();
    assert_eq!(
        inspector.columns(Some("public"), "comments").unwrap(),
        vec!["id", "user_id", "body"]
    );
}
