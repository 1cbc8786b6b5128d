//! Identifier qualification over the generic parse tree.
//!
//! After [`prepare_tree`] every table name is a 4-part chain
//! `database.catalog.schema.table`, table aliases are gone, every column is
//! a 5-part chain ending in the column name, and `expr AS alias` projection
//! items are reduced to `expr`.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

use super::inspector::SchemaInspector;
use crate::error::{Error, Result};
use crate::sql::parse::{ident_value, ident_values, make_ident, ParseTree};

/// Parts of a fully qualified table name.
pub const TABLE_PARTS: usize = 4;

/// Default value for unknown chain parts.
pub const DEFAULT_PLACEHOLDER: &str = "null";

/// Location used to complete partial names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierContext {
    pub database: String,
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl QualifierContext {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            catalog: None,
            schema: None,
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// `[database, catalog, schema]`, with `placeholder` for missing parts.
    fn prefix(&self, placeholder: &str) -> [String; 3] {
        [
            self.database.clone(),
            self.catalog.clone().unwrap_or_else(|| placeholder.to_string()),
            self.schema.clone().unwrap_or_else(|| placeholder.to_string()),
        ]
    }
}

/// Qualify every table and column in `tree` in place.
pub fn prepare_tree(
    tree: &mut ParseTree,
    inspector: &dyn SchemaInspector,
    context: &QualifierContext,
    placeholder: &str,
) -> Result<()> {
    let prefix = context.prefix(placeholder);
    pad_tables(tree, &prefix);
    for select in tree.find_nodes_by_key("Select") {
        qualify_select(tree, &select, inspector, &prefix, placeholder)?;
    }
    strip_aliases(tree);
    Ok(())
}

/// Table names referenced by `tree`, in order of appearance.
pub fn table_names(tree: &ParseTree) -> Vec<Vec<String>> {
    tree.find_nodes_by_key("Table")
        .into_iter()
        .filter_map(|ptr| tree.get(&ptr).and_then(|t| t.get("name")).map(ident_values))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Replace `expr AS alias` projection items with `expr`.
pub fn strip_aliases(tree: &mut ParseTree) {
    for (ptr, parent) in tree.find_nodes_by_key_with_parent("ExprWithAlias") {
        let Some(expr) = tree.get(&ptr).and_then(|v| v.get("expr")).cloned() else {
            continue;
        };
        if let Some(item) = tree.get_mut(&parent) {
            *item = json!({ "UnnamedExpr": expr });
        }
    }
}

fn pad_tables(tree: &mut ParseTree, prefix: &[String; 3]) {
    for ptr in tree.find_nodes_by_key("Table") {
        let Some(name) = tree
            .get_mut(&ptr)
            .and_then(|t| t.get_mut("name"))
            .and_then(Value::as_array_mut)
        else {
            continue;
        };
        let missing = TABLE_PARTS.saturating_sub(name.len());
        if missing == 0 || name.is_empty() {
            continue;
        }
        let mut padded: Vec<Value> = prefix[..missing].iter().map(|p| make_ident(p)).collect();
        padded.append(name);
        *name = padded;
    }
}

fn qualify_select(
    tree: &mut ParseTree,
    select: &str,
    inspector: &dyn SchemaInspector,
    prefix: &[String; 3],
    placeholder: &str,
) -> Result<()> {
    // tables in scope, dropping their aliases
    let mut tables: Vec<Vec<String>> = vec![];
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    for (ptr, _) in tree.find_within("Table", &format!("{}/from", select), Some("Select")) {
        let Some(table) = tree.get_mut(&ptr).and_then(Value::as_object_mut) else {
            continue;
        };
        let name = table.get("name").map(ident_values).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        if let Some(alias) = table.get("alias").and_then(|a| a.get("name")) {
            aliases.insert(ident_value(alias).to_string(), name.clone());
        }
        if table.contains_key("alias") {
            table.insert("alias".into(), Value::Null);
        }
        tables.push(name);
    }

    for (ptr, _) in tree.find_within("CompoundIdentifier", select, Some("Select")) {
        let parts = tree.get(&ptr).map(ident_values).unwrap_or_default();
        let Some((column, qualifier)) = parts.split_last() else {
            continue;
        };
        let chain = qualify_compound(qualifier, &tables, &aliases, prefix);
        if let Some(value) = tree.get_mut(&ptr) {
            *value = chain_value(&chain, column);
        }
    }

    let mut columns: HashMap<Vec<String>, Vec<String>> = HashMap::new();
    for (ptr, parent) in tree.find_within("Identifier", select, Some("Select")) {
        let column = tree.get(&ptr).map(ident_value).unwrap_or_default().to_string();
        let mut owners = vec![];
        for table in &tables {
            if !columns.contains_key(table) {
                columns.insert(table.clone(), table_columns(inspector, table, placeholder)?);
            }
            if columns[table].iter().any(|c| c == &column) {
                owners.push(table);
            }
        }
        let owner = match owners.as_slice() {
            [] => return Err(Error::ColumnNotInAnyTable(column)),
            [owner] => (*owner).clone(),
            _ => return Err(Error::AmbiguousTableColumn(column)),
        };
        debug!(column = %column, table = %owner.join("."), "resolved column");
        if let Some(value) = tree.get_mut(&parent) {
            *value = json!({ "CompoundIdentifier": chain_value(&owner, &column) });
        }
    }

    Ok(())
}

/// Full table chain for a column qualifier.
///
/// Aliases and in-scope table names resolve to their table; anything else
/// is padded from the context.
fn qualify_compound(
    qualifier: &[String],
    tables: &[Vec<String>],
    aliases: &HashMap<String, Vec<String>>,
    prefix: &[String; 3],
) -> Vec<String> {
    if let [name] = qualifier {
        if let Some(table) = aliases.get(name) {
            return table.clone();
        }
        if let Some(table) = tables.iter().find(|t| t.last() == Some(name)) {
            return table.clone();
        }
    }
    let missing = TABLE_PARTS.saturating_sub(qualifier.len()).min(3);
    prefix[..missing]
        .iter()
        .chain(qualifier)
        .cloned()
        .collect()
}

fn table_columns(
    inspector: &dyn SchemaInspector,
    table: &[String],
    placeholder: &str,
) -> Result<Vec<String>> {
    let (name, schema) = match table {
        [.., schema, name] => (name, Some(schema.as_str())),
        [name] => (name, None),
        [] => return Ok(vec![]),
    };
    inspector.columns(schema.filter(|s| *s != placeholder), name)
}

fn chain_value(table: &[String], column: &str) -> Value {
    Value::Array(
        table
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(column))
            .map(make_ident)
            .collect(),
    )
}
