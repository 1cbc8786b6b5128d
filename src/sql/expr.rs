//! Expression AST - the typed form every compiled query goes through.
//!
//! This module provides a strongly-typed AST for SQL expressions
//! with exhaustive pattern matching enforced by the compiler.
//!
//! Identifiers keep their original quoting so a parsed statement renders
//! back the way it was written. Columns carry an optional owning [`Table`]
//! or [`Namespace`]; both qualify the column the same way when rendered.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::dialect::{Dialect, SqlDialect};
use super::query::Query;
use super::token::{Token, TokenStream};
use crate::error::Result;

// =============================================================================
// Identifiers
// =============================================================================

/// A single identifier part with its quote style.
///
/// Equality and hashing look at the value only: `"users"` and `users`
/// name the same thing once parsed.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    pub value: String,
    pub quote_style: Option<char>,
}

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote_style: None,
        }
    }

    /// A double-quoted identifier.
    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote_style: Some('"'),
        }
    }

    pub fn to_token(&self) -> Token {
        Token::Name {
            value: self.value.clone(),
            quoted: self.quote_style.is_some(),
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// An ordered identifier path, e.g. `catalog.schema`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub names: Vec<Name>,
}

impl Namespace {
    pub fn new(names: Vec<Name>) -> Self {
        Self { names }
    }

    /// Build a namespace from unquoted parts.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        Self {
            names: parts.iter().map(|p| Name::new(p.as_ref())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Dotted form, ignoring quoting.
    pub fn dotted(&self) -> String {
        join_values(&self.names)
    }

    fn push_tokens(&self, ts: &mut TokenStream) {
        for name in &self.names {
            ts.push(name.to_token()).push(Token::Dot);
        }
    }
}

/// A table reference: `[namespace.]name [AS alias]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table {
    pub name: Name,
    pub namespace: Option<Namespace>,
    pub alias: Option<Name>,
}

impl Table {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            alias: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    pub fn with_alias(mut self, alias: impl Into<Name>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Full dotted name, without the alias.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns.dotted(), self.name.value),
            None => self.name.value.clone(),
        }
    }

    /// The identifier path columns use to refer to this table.
    pub fn reference(&self) -> Vec<Name> {
        if let Some(alias) = &self.alias {
            return vec![alias.clone()];
        }
        let mut parts = self
            .namespace
            .as_ref()
            .map(|ns| ns.names.clone())
            .unwrap_or_default();
        parts.push(self.name.clone());
        parts
    }

    /// Tokens for use in a FROM/JOIN clause.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        if let Some(ns) = &self.namespace {
            ns.push_tokens(&mut ts);
        }
        ts.push(self.name.to_token());
        if let Some(alias) = &self.alias {
            ts.space().push(Token::As).space().push(alias.to_token());
        }
        ts
    }
}

/// A column reference.
///
/// Qualification is first-writer-wins: once a column has a table or a
/// namespace, [`Column::add_table`] and [`Column::add_namespace`] are no-ops.
#[derive(Debug, Clone, Eq)]
pub struct Column {
    pub name: Name,
    pub table: Option<Table>,
    pub namespace: Option<Namespace>,
}

impl Column {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            table: None,
            namespace: None,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.table.is_some() || self.namespace.is_some()
    }

    /// Attach an owning table unless the column is already qualified.
    pub fn add_table(&mut self, table: Table) {
        if !self.is_qualified() {
            self.table = Some(table);
        }
    }

    /// Attach a namespace unless the column is already qualified.
    pub fn add_namespace(&mut self, namespace: Namespace) {
        if !self.is_qualified() && !namespace.is_empty() {
            self.namespace = Some(namespace);
        }
    }

    /// The path that qualifies this column when rendered.
    pub fn qualifier(&self) -> Vec<Name> {
        match (&self.table, &self.namespace) {
            (Some(table), _) => table.reference(),
            (None, Some(ns)) => ns.names.clone(),
            (None, None) => vec![],
        }
    }

    /// Dotted qualifier, if any.
    pub fn qualifier_name(&self) -> Option<String> {
        let qualifier = self.qualifier();
        if qualifier.is_empty() {
            None
        } else {
            Some(join_values(&qualifier))
        }
    }

    /// `qualifier.name`, ignoring quoting.
    pub fn full_name(&self) -> String {
        match self.qualifier_name() {
            Some(q) => format!("{}.{}", q, self.name.value),
            None => self.name.value.clone(),
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        for part in self.qualifier() {
            ts.push(part.to_token()).push(Token::Dot);
        }
        ts.push(self.name.to_token());
        ts
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.qualifier() == other.qualifier()
    }
}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.qualifier().hash(state);
    }
}

fn join_values(names: &[Name]) -> String {
    names
        .iter()
        .map(|n| n.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens_for_dialect()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(Column),

    /// Literal values
    Literal(Literal),

    /// `*` or `namespace.*`
    Wildcard(Option<Namespace>),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: [namespace.]name([DISTINCT] args...)
    Function {
        name: Name,
        namespace: Option<Namespace>,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// CASE [operand] WHEN c THEN r ... [ELSE e] END
    Case {
        operand: Option<Box<Expr>>,
        conditions: Vec<Expr>,
        results: Vec<Expr>,
        else_result: Option<Box<Expr>>,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// IN: expr IN (values...)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// expr AS alias
    Alias { alias: Name, child: Box<Expr> },

    /// Parenthesized expression
    Nested(Box<Expr>),

    /// Subquery: (SELECT ...)
    Subquery(Box<Query>),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    // String
    Concat,
    Like,
    NotLike,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Lte
            | BinaryOperator::Gte
            | BinaryOperator::Like
            | BinaryOperator::NotLike => 4,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 5,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 6,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl Expr {
    /// Build a binary expression, parenthesizing operands that bind looser.
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(left.nest_below(op)),
            op,
            right: Box::new(right.nest_below(op)),
        }
    }

    fn nest_below(self, op: BinaryOperator) -> Expr {
        match &self {
            Expr::BinaryOp { op: inner, .. } if inner.precedence() < op.precedence() => {
                Expr::Nested(Box::new(self))
            }
            _ => self,
        }
    }

    /// Drop an outer `AS alias`.
    pub fn unaliased(self) -> Expr {
        match self {
            Expr::Alias { child, .. } => *child,
            other => other,
        }
    }

    /// The alias name if this is an aliased expression.
    pub fn alias_name(&self) -> Option<&Name> {
        match self {
            Expr::Alias { alias, .. } => Some(alias),
            _ => None,
        }
    }

    /// Direct children, not descending into subqueries.
    fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Wildcard(_) | Expr::Subquery(_) => vec![],
            Expr::BinaryOp { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expr::UnaryOp { expr, .. } | Expr::IsNull { expr, .. } => vec![expr.as_mut()],
            Expr::Function { args, .. } => args.iter_mut().collect(),
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                let mut out: Vec<&mut Expr> = vec![];
                if let Some(op) = operand {
                    out.push(op.as_mut());
                }
                out.extend(conditions.iter_mut());
                out.extend(results.iter_mut());
                if let Some(e) = else_result {
                    out.push(e.as_mut());
                }
                out
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![expr.as_mut(), low.as_mut(), high.as_mut()],
            Expr::InList { expr, list, .. } => {
                let mut out = vec![expr.as_mut()];
                out.extend(list.iter_mut());
                out
            }
            Expr::Alias { child, .. } | Expr::Nested(child) => vec![child.as_mut()],
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Wildcard(_) | Expr::Subquery(_) => vec![],
            Expr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::UnaryOp { expr, .. } | Expr::IsNull { expr, .. } => vec![expr.as_ref()],
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                let mut out: Vec<&Expr> = vec![];
                if let Some(op) = operand {
                    out.push(op.as_ref());
                }
                out.extend(conditions.iter());
                out.extend(results.iter());
                if let Some(e) = else_result {
                    out.push(e.as_ref());
                }
                out
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![expr.as_ref(), low.as_ref(), high.as_ref()],
            Expr::InList { expr, list, .. } => {
                let mut out = vec![expr.as_ref()];
                out.extend(list.iter());
                out
            }
            Expr::Alias { child, .. } | Expr::Nested(child) => vec![child.as_ref()],
        }
    }

    /// Pre-order rewrite. When `f` returns `true` the node counts as
    /// replaced and its children are not visited.
    pub fn transform<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expr) -> Result<bool>,
    {
        if f(self)? {
            return Ok(());
        }
        for child in self.children_mut() {
            child.transform(f)?;
        }
        Ok(())
    }

    /// All column references, in pre-order, outside of subqueries.
    pub fn columns(&self) -> Vec<&Column> {
        let mut out = vec![];
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a Column>) {
        if let Expr::Column(col) = self {
            out.push(col);
        }
        for child in self.children() {
            child.collect_columns(out);
        }
    }

    /// Mutable access to every column reference outside of subqueries.
    pub fn for_each_column_mut<F: FnMut(&mut Column)>(&mut self, f: &mut F) {
        if let Expr::Column(col) = self {
            f(col);
        }
        for child in self.children_mut() {
            child.for_each_column_mut(f);
        }
    }

    /// Convert this expression to a token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column(col) => {
                ts.append(&col.to_tokens());
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::Wildcard(namespace) => {
                if let Some(ns) = namespace {
                    ns.push_tokens(&mut ts);
                }
                ts.push(Token::Star);
            }

            Expr::BinaryOp { left, op, right } => {
                // CONCAT() for dialects where || means OR
                if *op == BinaryOperator::Concat && !dialect.supports_concat_operator() {
                    ts.push(Token::FunctionName("CONCAT".into()));
                    ts.lparen();
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.comma().space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                    ts.rparen();
                } else {
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.space();
                    ts.extend(binary_op_tokens(*op));
                    ts.space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                }
            }

            Expr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => ts.push(Token::Not).space(),
                    UnaryOperator::Minus => ts.push(Token::Minus),
                    UnaryOperator::Plus => ts.push(Token::Plus),
                };
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                namespace,
                args,
                distinct,
            } => {
                if let Some(ns) = namespace {
                    ns.push_tokens(&mut ts);
                }
                ts.push(Token::FunctionName(name.value.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                ts.push(Token::Case);
                if let Some(op) = operand {
                    ts.space().append(&op.to_tokens_for_dialect(dialect));
                }
                for (when, then) in conditions.iter().zip(results) {
                    ts.space().push(Token::When).space();
                    ts.append(&when.to_tokens_for_dialect(dialect));
                    ts.space().push(Token::Then).space();
                    ts.append(&then.to_tokens_for_dialect(dialect));
                }
                if let Some(else_expr) = else_result {
                    ts.space().push(Token::Else).space();
                    ts.append(&else_expr.to_tokens_for_dialect(dialect));
                }
                ts.space().push(Token::End);
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space().push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                // "x IN ()" is invalid SQL
                if list.is_empty() {
                    ts.push(Token::LitBool(*negated));
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in list.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::Alias { alias, child } => {
                ts.append(&child.to_tokens_for_dialect(dialect));
                ts.space().push(Token::As).space().push(alias.to_token());
            }

            Expr::Nested(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Subquery(query) => {
                ts.lparen();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.rparen();
            }
        }

        ts
    }

    /// Render this expression for a dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

fn binary_op_tokens(op: BinaryOperator) -> Vec<Token> {
    match op {
        BinaryOperator::Eq => vec![Token::Eq],
        BinaryOperator::Ne => vec![Token::Ne],
        BinaryOperator::Lt => vec![Token::Lt],
        BinaryOperator::Gt => vec![Token::Gt],
        BinaryOperator::Lte => vec![Token::Lte],
        BinaryOperator::Gte => vec![Token::Gte],
        BinaryOperator::And => vec![Token::And],
        BinaryOperator::Or => vec![Token::Or],
        BinaryOperator::Plus => vec![Token::Plus],
        BinaryOperator::Minus => vec![Token::Minus],
        BinaryOperator::Mul => vec![Token::Mul],
        BinaryOperator::Div => vec![Token::Div],
        BinaryOperator::Mod => vec![Token::Mod],
        BinaryOperator::Concat => vec![Token::Concat],
        BinaryOperator::Like => vec![Token::Like],
        BinaryOperator::NotLike => vec![Token::Not, Token::Space, Token::Like],
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column(Column::new(name))
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    let mut c = Column::new(column);
    c.add_table(Table::new(table));
    Expr::Column(c)
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a float literal.
pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

/// Create a NULL literal.
pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// `*`
pub fn star() -> Expr {
    Expr::Wildcard(None)
}

/// Create a function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: Name::new(name.to_uppercase()),
        namespace: None,
        args,
        distinct: false,
    }
}

/// `COUNT(*)`
pub fn count_star() -> Expr {
    func("COUNT", vec![star()])
}

/// `SUM(expr)`
pub fn sum(expr: Expr) -> Expr {
    func("SUM", vec![expr])
}

impl From<Column> for Expr {
    fn from(c: Column) -> Self {
        Expr::Column(c)
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self.into_expr()),
        }
    }

    fn alias(self, alias: impl Into<Name>) -> Expr {
        Expr::Alias {
            alias: alias.into(),
            child: Box::new(self.into_expr()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
