//! Query AST - SELECT statements with CTEs, joins and derived tables.

use std::fmt;

use super::dialect::{order_by_placeholder, Dialect, SqlDialect};
use super::expr::{BinaryOperator, Expr, Name, Table};
use super::token::{Token, TokenStream};

// =============================================================================
// Relations
// =============================================================================

/// Something a query can select from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableExpr {
    Table(Table),
    /// Derived table: `(SELECT ...) AS alias`
    Subquery {
        query: Box<Query>,
        alias: Option<Name>,
    },
}

impl TableExpr {
    /// Alias or bare name used to refer to this relation.
    pub fn reference_name(&self) -> Option<&Name> {
        match self {
            TableExpr::Table(t) => Some(t.alias.as_ref().unwrap_or(&t.name)),
            TableExpr::Subquery { alias, .. } => alias.as_ref(),
        }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        match self {
            TableExpr::Table(table) => table.to_tokens(),
            TableExpr::Subquery { query, alias } => {
                let mut ts = TokenStream::new();
                ts.lparen().newline();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.newline().rparen();
                if let Some(alias) = alias {
                    ts.space().push(Token::As).space().push(alias.to_token());
                }
                ts
            }
        }
    }
}

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: TableExpr,
    pub on: Option<Expr>,
}

impl Join {
    pub fn new(kind: JoinKind, relation: TableExpr, on: Option<Expr>) -> Self {
        Self { kind, relation, on }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self.kind {
            JoinKind::Inner => ts.push(Token::Inner),
            JoinKind::Left => ts.push(Token::Left).space().push(Token::Outer),
            JoinKind::Right => ts.push(Token::Right).space().push(Token::Outer),
            JoinKind::Full => ts.push(Token::Full).space().push(Token::Outer),
            JoinKind::Cross => ts.push(Token::Cross),
        };

        ts.space().push(Token::Join).space();
        ts.append(&self.relation.to_tokens_for_dialect(dialect));

        if let Some(on) = &self.on {
            ts.space().push(Token::On).space();
            ts.append(&on.to_tokens_for_dialect(dialect));
        }

        ts
    }
}

/// A FROM item with the joins chained onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub primary: TableExpr,
    pub joins: Vec<Join>,
}

impl Relation {
    pub fn new(primary: TableExpr) -> Self {
        Self {
            primary,
            joins: vec![],
        }
    }

    /// Every table expression in this relation, primary first.
    pub fn table_exprs(&self) -> impl Iterator<Item = &TableExpr> {
        std::iter::once(&self.primary).chain(self.joins.iter().map(|j| &j.relation))
    }
}

/// The FROM clause: comma-separated relations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromClause {
    pub relations: Vec<Relation>,
}

impl FromClause {
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        for (i, relation) in self.relations.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&relation.primary.to_tokens_for_dialect(dialect));
            for join in &relation.joins {
                ts.newline();
                ts.append(&join.to_tokens_for_dialect(dialect));
            }
        }
        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    /// `Some(true)` for ASC, `Some(false)` for DESC.
    pub asc: Option<bool>,
    pub nulls_first: Option<bool>,
}

impl OrderBy {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            asc: None,
            nulls_first: None,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            asc: Some(false),
            nulls_first: None,
        }
    }

    /// Skips NULLS FIRST/LAST for dialects that don't support it.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = self.expr.to_tokens_for_dialect(dialect);

        if let Some(asc) = self.asc {
            ts.space().push(if asc { Token::Asc } else { Token::Desc });
        }

        if let Some(first) = self.nulls_first {
            if dialect.supports_nulls_ordering() {
                ts.space().push(if first {
                    Token::NullsFirst
                } else {
                    Token::NullsLast
                });
            }
        }

        ts
    }
}

// =============================================================================
// SELECT
// =============================================================================

/// A SELECT statement body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<Expr>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new(projection: Vec<Expr>) -> Self {
        Self {
            projection,
            ..Default::default()
        }
    }

    /// AND a predicate into the WHERE clause.
    pub fn add_filter(&mut self, predicate: Expr) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Expr::binary(existing, BinaryOperator::And, predicate),
            None => predicate,
        });
    }

    /// The first relation of the FROM clause, created from `primary` if absent.
    pub fn first_relation_mut(&mut self, primary: impl FnOnce() -> TableExpr) -> &mut Relation {
        let from = self.from.get_or_insert_with(FromClause::default);
        if from.relations.is_empty() {
            from.relations.push(Relation::new(primary()));
        }
        &mut from.relations[0]
    }

    /// Every table expression in FROM, including joined ones.
    pub fn table_exprs(&self) -> Vec<&TableExpr> {
        self.from
            .iter()
            .flat_map(|f| f.relations.iter())
            .flat_map(|r| r.table_exprs())
            .collect()
    }

    pub fn table_exprs_mut(&mut self) -> Vec<&mut TableExpr> {
        let mut out = vec![];
        for relation in self.from.iter_mut().flat_map(|f| f.relations.iter_mut()) {
            out.push(&mut relation.primary);
            out.extend(relation.joins.iter_mut().map(|j| &mut j.relation));
        }
        out
    }

    pub fn join_conditions_mut(&mut self) -> impl Iterator<Item = &mut Expr> {
        self.from
            .iter_mut()
            .flat_map(|f| f.relations.iter_mut())
            .flat_map(|r| r.joins.iter_mut())
            .filter_map(|j| j.on.as_mut())
    }

    /// Mutable access to every expression slot outside of FROM.
    pub fn exprs_mut(&mut self) -> impl Iterator<Item = &mut Expr> {
        self.projection
            .iter_mut()
            .chain(self.where_clause.iter_mut())
            .chain(self.group_by.iter_mut())
            .chain(self.having.iter_mut())
            .chain(self.order_by.iter_mut().map(|o| &mut o.expr))
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }

        for (i, item) in self.projection.iter().enumerate() {
            if i == 0 {
                ts.newline().indent(1);
            } else {
                ts.comma().newline().indent(1);
            }
            ts.append(&item.to_tokens_for_dialect(dialect));
        }

        if let Some(from) = &self.from {
            if !from.relations.is_empty() {
                ts.newline().push(Token::From).space();
                ts.append(&from.to_tokens_for_dialect(dialect));
            }
        }

        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens_for_dialect(dialect));
        }

        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        if let Some(having) = &self.having {
            ts.newline().push(Token::Having).space();
            ts.append(&having.to_tokens_for_dialect(dialect));
        }

        let paginated = self.limit.is_some() || self.offset.is_some();
        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&order.to_tokens_for_dialect(dialect));
            }
        } else if paginated && dialect.requires_order_by_for_offset() {
            ts.newline().append(&order_by_placeholder());
        }

        if paginated {
            ts.newline();
            ts.append(&dialect.emit_limit_offset(self.limit, self.offset));
        }

        ts
    }
}

// =============================================================================
// Query
// =============================================================================

/// A named subquery in a WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Name,
    pub query: Box<Query>,
}

impl Cte {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(self.name.to_token())
            .space()
            .push(Token::As)
            .space()
            .lparen()
            .newline();
        ts.append(&self.query.to_tokens_for_dialect(dialect));
        ts.newline().rparen();
        ts
    }
}

/// A full query: optional CTEs and a SELECT body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub ctes: Vec<Cte>,
    pub select: Select,
}

impl Query {
    pub fn new(select: Select) -> Self {
        Self {
            ctes: vec![],
            select,
        }
    }

    /// Convert to tokens using the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        if !self.ctes.is_empty() {
            ts.push(Token::With).space();
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    ts.comma().newline();
                }
                ts.append(&cte.to_tokens_for_dialect(dialect));
            }
            ts.newline();
        }

        ts.append(&self.select.to_tokens_for_dialect(dialect));
        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}
