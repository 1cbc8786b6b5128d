use junction::sql::{
    col, count_star, func, lit_bool, lit_int, lit_str, sum, table_col, Column, Dialect, Expr,
    ExprExt, FromClause, Join, JoinKind, Name, Namespace, OrderBy, Query, Relation, Select, Table,
    TableExpr,
};

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn from_table(name: &str) -> Option<FromClause> {
    Some(FromClause::new(vec![Relation::new(TableExpr::Table(
        Table::new(name),
    ))]))
}

#[test]
fn test_grouped_query_layout() {
    let mut select = Select::new(vec![count_star(), table_col("parent", "ds")]);
    select.from = from_table("parent");
    select.add_filter(table_col("parent", "user_id").gt(1));
    select.group_by = vec![table_col("parent", "ds")];

    insta::assert_snapshot!(Query::new(select).to_sql(Dialect::Postgres), @r"
    SELECT
      COUNT(*),
      parent.ds
    FROM parent
    WHERE parent.user_id > 1
    GROUP BY parent.ds
    ");
}

#[test]
fn test_qualification_paths_render_identically() {
    let mut by_table = Column::new("ds");
    by_table.add_table(Table::new("parent"));

    let mut by_namespace = Column::new("ds");
    by_namespace.add_namespace(Namespace::from_parts(&["parent"]));

    assert_eq!(
        Expr::Column(by_table).to_sql(Dialect::Postgres),
        Expr::Column(by_namespace).to_sql(Dialect::Postgres)
    );
}

#[test]
fn test_first_qualification_wins() {
    let mut column = Column::new("ds");
    column.add_table(Table::new("a"));
    column.add_table(Table::new("b"));
    column.add_namespace(Namespace::from_parts(&["c"]));
    assert_eq!(column.full_name(), "a.ds");
}

#[test]
fn test_aliased_table_qualifies_by_alias() {
    let table = Table::new("raw_comments")
        .with_namespace(Namespace::from_parts(&["public"]))
        .with_alias("comments");
    let mut column = Column::new("id");
    column.add_table(table);
    assert_eq!(Expr::Column(column).to_sql(Dialect::Postgres), "comments.id");
}

#[test]
fn test_identifier_quoting_per_dialect() {
    let expr = Expr::Alias {
        alias: Name::new("core.num_comments"),
        child: Box::new(count_star()),
    };
    assert_eq!(
        expr.to_sql(Dialect::Postgres),
        r#"COUNT(*) AS "core.num_comments""#
    );
    assert_eq!(expr.to_sql(Dialect::MySql), "COUNT(*) AS `core.num_comments`");
    assert_eq!(expr.to_sql(Dialect::TSql), "COUNT(*) AS [core.num_comments]");
}

#[test]
fn test_boolean_literals_per_dialect() {
    let expr = col("active").eq(lit_bool(true));
    assert_eq!(expr.to_sql(Dialect::Postgres), "active = true");
    assert_eq!(expr.to_sql(Dialect::Sqlite), "active = 1");
}

#[test]
fn test_precedence_adds_parentheses() {
    let expr = col("a").eq(1).or(col("b").eq(2)).and(col("c").eq(3));
    assert_eq!(
        expr.to_sql(Dialect::Postgres),
        "(a = 1 OR b = 2) AND c = 3"
    );
}

#[test]
fn test_string_literal_escaping() {
    assert_eq!(
        col("name").eq(lit_str("O'Brien")).to_sql(Dialect::DuckDb),
        "name = 'O''Brien'"
    );
}

#[test]
fn test_dimension_join_query() {
    let mut select = Select::new(vec![
        sum(table_col("comments", "likes")).alias("likes"),
        table_col("users", "country"),
    ]);
    select.from = from_table("comments");
    select.first_relation_mut(|| unreachable!()).joins.push(Join::new(
        JoinKind::Inner,
        TableExpr::Table(Table::new("users")),
        Some(table_col("comments", "user_id").eq(table_col("users", "id"))),
    ));
    select.group_by = vec![table_col("users", "country")];
    select.order_by = vec![OrderBy::desc(col("likes"))];
    select.limit = Some(5);

    assert_eq!(
        normalize(&Query::new(select).to_sql(Dialect::DuckDb)),
        "SELECT SUM(comments.likes) AS likes, users.country FROM comments \
         INNER JOIN users ON comments.user_id = users.id \
         GROUP BY users.country ORDER BY likes DESC LIMIT 5"
    );
}

#[test]
fn test_function_names_uppercased() {
    assert_eq!(
        func("coalesce", vec![col("a"), lit_int(0)]).to_sql(Dialect::Postgres),
        "COALESCE(a, 0)"
    );
}
