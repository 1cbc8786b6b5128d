//! Filter mini-grammar: `<name><op><literal>`.
//!
//! ```text
//! users.age>=18
//! events.kind='click'
//! users.deleted=null
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::sql::{BinaryOperator, Column, Expr, Literal};

static FILTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w\./_]+)(<=|<|>=|>|!=|=)(.+)$").unwrap());

/// Comparison operators accepted in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl FilterOp {
    pub const ALL: [FilterOp; 6] = [
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::Eq,
        FilterOp::Ne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
        }
    }

    pub fn parse(op: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == op)
            .ok_or_else(|| Error::InvalidOperation {
                op: op.to_string(),
                valid: Self::ALL
                    .iter()
                    .map(|o| o.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn to_binary(self) -> BinaryOperator {
        match self {
            FilterOp::Gt => BinaryOperator::Gt,
            FilterOp::Gte => BinaryOperator::Gte,
            FilterOp::Lt => BinaryOperator::Lt,
            FilterOp::Lte => BinaryOperator::Lte,
            FilterOp::Eq => BinaryOperator::Eq,
            FilterOp::Ne => BinaryOperator::Ne,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Dimension reference, `<node>.<column>`.
    pub name: String,
    pub op: FilterOp,
    pub value: Literal,
}

impl Filter {
    /// The `(node, column)` pair this filter restricts.
    pub fn dimension(&self) -> Result<(&str, &str)> {
        self.name
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidColumnName(self.name.clone()))
    }

    /// Predicate over `column`.
    pub fn to_expr(&self, column: Column) -> Expr {
        Expr::binary(
            Expr::Column(column),
            self.op.to_binary(),
            Expr::Literal(self.value.clone()),
        )
    }
}

pub fn parse_filter(filter: &str) -> Result<Filter> {
    let caps = FILTER_REGEX
        .captures(filter)
        .ok_or_else(|| Error::InvalidFilter(filter.to_string()))?;
    let name = caps[1].to_string();
    let op = FilterOp::parse(&caps[2])?;
    let value = parse_literal(&caps[3])?;
    Ok(Filter { name, op, value })
}

/// Literal rules: integers, finite floats, quoted strings, booleans, null.
pub fn parse_literal(raw: &str) -> Result<Literal> {
    let value = raw.trim();

    if let Some(inner) = strip_quotes(value) {
        return Ok(Literal::String(inner.to_string()));
    }

    match value.to_ascii_lowercase().as_str() {
        "true" => return Ok(Literal::Bool(true)),
        "false" => return Ok(Literal::Bool(false)),
        "null" | "none" => return Ok(Literal::Null),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return Ok(Literal::Int(n));
    }

    let numeric = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if numeric {
        if let Ok(f) = value.parse::<f64>() {
            if f.is_finite() {
                return Ok(Literal::Float(f));
            }
        }
    }

    Err(Error::InvalidValue(raw.to_string()))
}

fn strip_quotes(value: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            if !inner.contains(quote) {
                return Some(inner);
            }
        }
    }
    None
}
