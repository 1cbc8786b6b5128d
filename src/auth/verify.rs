//! Permission verification.
//!
//! A permission is SQL naming the tables a caller may read:
//!
//! ```text
//! SELECT * FROM postgres.null.main.sales; SELECT * FROM postgres.null.main.refunds
//! ```
//!
//! Each statement of a permission is an alternative. Query tables are fully
//! qualified first; permission tables are compared part by part from the
//! left, with the placeholder matching any value.

use sqlparser::ast::Statement;
use tracing::{debug, instrument};

use super::inspector::SchemaInspector;
use super::qualify::{prepare_tree, strip_aliases, table_names, QualifierContext};
use crate::error::{Error, Result};
use crate::sql::parse::{parse_sql, ParseTree};

/// Tables allowed by one permission statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPattern {
    pub tables: Vec<Vec<String>>,
}

impl PermissionPattern {
    /// Whether every table in `tables` is covered by this pattern.
    pub fn allows(&self, tables: &[Vec<String>], placeholder: &str) -> bool {
        tables.iter().all(|table| {
            self.tables
                .iter()
                .any(|allowed| table_matches(allowed, table, placeholder))
        })
    }
}

/// Compare a permission table against a qualified query table.
///
/// Parts are compared by value. A permission part equal to `placeholder`
/// matches anything; a shorter permission chain is a prefix match.
pub fn table_matches(allowed: &[String], table: &[String], placeholder: &str) -> bool {
    allowed.len() <= table.len()
        && allowed
            .iter()
            .zip(table)
            .all(|(a, t)| a == placeholder || a == t)
}

/// Parse `sql` into a tree, refusing anything but queries.
///
/// Only `Table` factors are collected as referenced tables, so statements
/// that carry their targets elsewhere (INSERT, DROP, ...) cannot be checked.
fn parse_queries(sql: &str) -> Result<ParseTree> {
    let statements = parse_sql(sql, None)?;
    if let Some(other) = statements
        .iter()
        .find(|statement| !matches!(statement, Statement::Query(_)))
    {
        let text = other.to_string();
        let keyword = text.split_whitespace().next().unwrap_or_default();
        return Err(Error::NotImplemented(format!("{} statement", keyword)));
    }
    ParseTree::from_statements(&statements)
}

/// Parse a permission into its alternative patterns.
pub fn parse_permission(permission: &str) -> Result<Vec<PermissionPattern>> {
    let mut tree = parse_queries(permission)?;
    strip_aliases(&mut tree);
    Ok(tree
        .into_statements()
        .iter()
        .map(|statement| PermissionPattern {
            tables: table_names(statement),
        })
        .collect())
}

/// Check `sql` against every permission.
///
/// Every statement of the query must be allowed by every permission, where
/// a permission allows a statement if any of its alternatives covers all
/// of the statement's tables. Qualification failures are errors, not
/// denials, and so are statements other than queries. No permissions
/// means nothing is allowed.
#[instrument(skip_all)]
pub fn verify_query(
    sql: &str,
    permissions: &[String],
    inspector: &dyn SchemaInspector,
    context: &QualifierContext,
    placeholder: &str,
) -> Result<bool> {
    if permissions.is_empty() {
        debug!("no permissions supplied");
        return Ok(false);
    }

    let mut tree = parse_queries(sql)?;
    prepare_tree(&mut tree, inspector, context, placeholder)?;
    let statements: Vec<Vec<Vec<String>>> = tree
        .into_statements()
        .iter()
        .map(table_names)
        .collect();

    let permissions = permissions
        .iter()
        .map(|p| parse_permission(p))
        .collect::<Result<Vec<_>>>()?;

    // TODO: restrict projected columns once permission projections carry
    // column-level meaning; tables are the only enforced level today.
    for (index, tables) in statements.iter().enumerate() {
        for (position, patterns) in permissions.iter().enumerate() {
            if !patterns.iter().any(|p| p.allows(tables, placeholder)) {
                debug!(statement = index, permission = position, "denied");
                return Ok(false);
            }
        }
    }
    Ok(true)
}
