//! Parser boundary and the generic parse tree.
//!
//! SQL text goes through `sqlparser`; the statements it returns can be
//! viewed as a [`ParseTree`], a JSON document keyed by grammar production
//! (`Select`, `Table`, `Identifier`, `CompoundIdentifier`, ...). The
//! qualifier rewrites that document in place. Everything else works on the
//! typed AST produced by [`crate::sql::translate`].

use serde_json::Value;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::dialect::Dialect;
use crate::error::{Error, Result};

/// Parse SQL text into statements, with a dialect's grammar if given.
pub fn parse_sql(sql: &str, dialect: Option<Dialect>) -> Result<Vec<Statement>> {
    let statements = match dialect {
        Some(d) => Parser::parse_sql(&*d.parser_dialect(), sql)?,
        None => Parser::parse_sql(&GenericDialect {}, sql)?,
    };
    Ok(statements)
}

/// Parse SQL that must hold exactly one query.
pub fn parse_single_query(sql: &str, dialect: Option<Dialect>) -> Result<sqlparser::ast::Query> {
    let mut statements = parse_sql(sql, dialect)?;
    if statements.len() != 1 {
        return Err(Error::InvalidSql(format!(
            "expected a single statement, found {}",
            statements.len()
        )));
    }
    match statements.remove(0) {
        Statement::Query(query) => Ok(*query),
        other => Err(Error::InvalidSql(format!("not a query: {}", other))),
    }
}

/// A statement list as a generic tree of maps and arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    root: Value,
}

impl ParseTree {
    pub fn from_statements(statements: &[Statement]) -> Result<Self> {
        Ok(Self {
            root: serde_json::to_value(statements)?,
        })
    }

    pub fn parse(sql: &str, dialect: Option<Dialect>) -> Result<Self> {
        Self::from_statements(&parse_sql(sql, dialect)?)
    }

    /// Wrap an already-built tree.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Top-level statements; one pointer per statement.
    pub fn statement_pointers(&self) -> Vec<String> {
        match &self.root {
            Value::Array(items) => (0..items.len()).map(|i| format!("/{}", i)).collect(),
            _ => vec![],
        }
    }

    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    pub fn get_mut(&mut self, pointer: &str) -> Option<&mut Value> {
        self.root.pointer_mut(pointer)
    }

    /// Split the tree into one tree per statement.
    pub fn into_statements(self) -> Vec<ParseTree> {
        match self.root {
            Value::Array(items) => items.into_iter().map(ParseTree::from_value).collect(),
            other => vec![ParseTree::from_value(other)],
        }
    }

    /// Pointers to every value stored under `key`, pre-order.
    pub fn find_nodes_by_key(&self, key: &str) -> Vec<String> {
        self.find_nodes_by_key_with_parent(key)
            .into_iter()
            .map(|(node, _)| node)
            .collect()
    }

    /// Like [`ParseTree::find_nodes_by_key`], paired with the pointer of the
    /// map holding the key so callers can replace the whole entry.
    pub fn find_nodes_by_key_with_parent(&self, key: &str) -> Vec<(String, String)> {
        self.find_within(key, "", None)
    }

    /// Search below `base` only, not descending into values under `stop`.
    pub fn find_within(&self, key: &str, base: &str, stop: Option<&str>) -> Vec<(String, String)> {
        let mut found = vec![];
        if let Some(start) = self.root.pointer(base) {
            walk(start, base, key, stop, &mut found);
        }
        found
    }
}

fn walk(
    value: &Value,
    path: &str,
    key: &str,
    stop: Option<&str>,
    found: &mut Vec<(String, String)>,
) {
    match value {
        Value::Object(map) => {
            for (k, child) in map {
                let child_path = format!("{}/{}", path, escape(k));
                if k == key {
                    found.push((child_path.clone(), path.to_string()));
                }
                if stop == Some(k.as_str()) {
                    continue;
                }
                walk(child, &child_path, key, stop, found);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, &format!("{}/{}", path, i), key, stop, found);
            }
        }
        _ => {}
    }
}

/// JSON pointer escaping of a single reference token.
fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// The `value` of every part of an identifier chain.
pub fn ident_values(parts: &Value) -> Vec<String> {
    parts
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|ident| ident_value(ident).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// The `value` of a single identifier.
pub fn ident_value(ident: &Value) -> &str {
    ident.get("value").and_then(Value::as_str).unwrap_or_default()
}

/// A bare identifier node with no quoting.
pub fn make_ident(value: &str) -> Value {
    serde_json::json!({ "value": value, "quote_style": null })
}
