//! DAG resolver - referenced columns, reachable dimensions and the
//! databases able to compute a node.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Database, Node, NodeGraph};
use crate::sql::parse::{ident_value, ident_values, ParseTree};

/// Columns each node contributes, keyed by node name.
pub type ReferencedColumns = BTreeMap<String, BTreeSet<String>>;

/// Partition the identifiers of an expression by parent.
///
/// Qualified identifiers name their parent directly or through a table
/// alias. Bare identifiers are matched against the parents' columns and
/// must belong to exactly one.
pub fn get_referenced_columns_from_sql(sql: &str, parents: &[&Node]) -> Result<ReferencedColumns> {
    let tree = ParseTree::parse(sql, None)?;
    get_referenced_columns_from_tree(&tree, parents)
}

/// Qualifier -> table name for every relation in FROM.
///
/// Derived tables and CTEs map to `None`; their columns are resolved where
/// they are selected.
fn relation_names(tree: &ParseTree) -> HashMap<String, Option<String>> {
    let alias_of = |value: &Value| {
        value
            .get("alias")
            .and_then(|alias| alias.get("name"))
            .map(|name| ident_value(name).to_string())
    };

    let mut names = HashMap::new();
    for pointer in tree.find_nodes_by_key("cte_tables") {
        if let Some(Value::Array(ctes)) = tree.get(&pointer) {
            names.extend(ctes.iter().filter_map(alias_of).map(|name| (name, None)));
        }
    }
    for pointer in tree.find_nodes_by_key("Derived") {
        if let Some(name) = tree.get(&pointer).and_then(alias_of) {
            names.insert(name, None);
        }
    }
    for pointer in tree.find_nodes_by_key("Table") {
        let Some(table) = tree.get(&pointer) else {
            continue;
        };
        let name = table.get("name").map(ident_values).unwrap_or_default().join(".");
        let target = match names.get(&name) {
            Some(None) => None,
            _ => Some(name.clone()),
        };
        if let Some(alias) = alias_of(table) {
            names.insert(alias, target);
        }
    }
    names
}

pub fn get_referenced_columns_from_tree(
    tree: &ParseTree,
    parents: &[&Node],
) -> Result<ReferencedColumns> {
    let mut referenced = ReferencedColumns::new();
    let relations = relation_names(tree);

    for pointer in tree.find_nodes_by_key("CompoundIdentifier") {
        let parts = tree.get(&pointer).map(ident_values).unwrap_or_default();
        let Some((column, qualifier)) = parts.split_last() else {
            continue;
        };
        let qualifier = qualifier.join(".");
        let owner = match relations.get(&qualifier) {
            Some(Some(table)) => table.clone(),
            Some(None) => continue,
            None => qualifier.clone(),
        };
        if !parents.iter().any(|parent| parent.name == owner) {
            return Err(Error::InvalidIdentifier(qualifier));
        }
        referenced.entry(owner).or_default().insert(column.clone());
    }

    for pointer in tree.find_nodes_by_key("Identifier") {
        let column = tree.get(&pointer).map(ident_value).unwrap_or_default();
        let owners: Vec<&&Node> = parents.iter().filter(|p| p.has_column(column)).collect();
        match owners.as_slice() {
            [] => return Err(Error::ColumnNotFound(column.to_string())),
            [owner] => {
                referenced
                    .entry(owner.name.clone())
                    .or_default()
                    .insert(column.to_string());
            }
            _ => return Err(Error::AmbiguousColumn(column.to_string())),
        }
    }

    Ok(referenced)
}

/// Columns referenced by a node's own expression, per parent.
pub fn get_node_referenced_columns(graph: &NodeGraph, node: &Node) -> Result<ReferencedColumns> {
    match &node.expression {
        Some(expression) => get_referenced_columns_from_sql(expression, &graph.parents(node)),
        None => Ok(ReferencedColumns::new()),
    }
}

/// Every `"<node>.<column>"` a node can be grouped or filtered by, sorted.
///
/// Walks the parents' columns (or the node's own when it has no parents)
/// and follows dimension links, transitively, to the linked nodes' columns.
pub fn get_dimensions(graph: &NodeGraph, node: &Node) -> Result<Vec<String>> {
    let roots = if node.parents.is_empty() {
        vec![node]
    } else {
        graph.parents(node)
    };

    let mut dimensions = BTreeSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&Node> = roots;
    while let Some(current) = stack.pop() {
        if !visited.insert(current.name.as_str()) {
            continue;
        }
        for column in &current.columns {
            dimensions.insert(format!("{}.{}", current.name, column.name));
            if let Some(dimension) = &column.dimension {
                stack.push(graph.node(dimension)?);
            }
        }
    }

    Ok(dimensions.into_iter().collect())
}

/// Databases where every column in `columns` can be computed for `node`.
///
/// A database qualifies when the node is materialized there with all the
/// columns, or when every parent can compute what the node's expression
/// needs from it. Result keeps catalog order.
pub fn get_computable_databases<'g>(
    graph: &'g NodeGraph,
    node: &Node,
    columns: &BTreeSet<String>,
) -> Result<Vec<&'g Database>> {
    let ids = computable_database_ids(graph, node, columns)?;
    Ok(graph
        .databases()
        .iter()
        .filter(|db| ids.contains(&db.id))
        .collect())
}

fn computable_database_ids(
    graph: &NodeGraph,
    node: &Node,
    columns: &BTreeSet<String>,
) -> Result<BTreeSet<i64>> {
    let mut ids: BTreeSet<i64> = node
        .tables
        .iter()
        .filter(|t| columns.iter().all(|c| t.columns.is_empty() || t.has_column(c)))
        .map(|t| t.database_id)
        .collect();

    let parents = graph.parents(node);
    if !parents.is_empty() {
        let referenced = get_node_referenced_columns(graph, node)?;
        let empty = BTreeSet::new();
        let mut common: Option<BTreeSet<i64>> = None;
        for parent in parents {
            let needed = referenced.get(&parent.name).unwrap_or(&empty);
            let parent_ids = computable_database_ids(graph, parent, needed)?;
            common = Some(match common {
                Some(acc) => acc.intersection(&parent_ids).copied().collect(),
                None => parent_ids,
            });
        }
        ids.extend(common.unwrap_or_default());
    }

    Ok(ids)
}

/// Pick the database that can compute every node with its columns.
///
/// With no nodes every database qualifies. A requested id must be among
/// the candidates. Otherwise the cheapest wins; ties keep catalog order.
pub fn get_database_for_nodes<'g>(
    graph: &'g NodeGraph,
    nodes: &[&Node],
    referenced: &ReferencedColumns,
    database_id: Option<i64>,
) -> Result<&'g Database> {
    let empty = BTreeSet::new();
    let mut candidates: Vec<&Database> = graph.databases().iter().collect();
    for node in nodes {
        let columns = referenced.get(&node.name).unwrap_or(&empty);
        let ids = computable_database_ids(graph, node, columns)?;
        candidates.retain(|db| ids.contains(&db.id));
    }

    if candidates.is_empty() {
        return Err(Error::NoValidDatabase);
    }

    if let Some(id) = database_id {
        candidates.retain(|db| db.id == id);
        if candidates.is_empty() {
            return Err(Error::InvalidDatabaseId(id));
        }
    }

    candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    let chosen = candidates[0];
    debug!(database = %chosen.name, id = chosen.id, "selected database");
    Ok(chosen)
}

/// Nodes that can be grouped by `dimension`, sorted by name.
///
/// `dimension` is either a node name or a `"<node>.<column>"` reference.
pub fn get_nodes_with_dimension<'g>(graph: &'g NodeGraph, dimension: &str) -> Result<Vec<&'g Node>> {
    let mut out = vec![];
    for node in graph.nodes() {
        if node.name == dimension {
            continue;
        }
        let reachable = get_dimensions(graph, node)?;
        let matches = reachable.iter().any(|d| {
            d == dimension
                || d.rsplit_once('.')
                    .map(|(name, _)| name == dimension)
                    .unwrap_or(false)
        });
        if matches {
            out.push(node);
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Nodes that can be grouped by every one of `dimensions`, sorted by name.
pub fn get_nodes_with_common_dimensions<'g>(
    graph: &'g NodeGraph,
    dimensions: &[&str],
) -> Result<Vec<&'g Node>> {
    let mut common: Option<Vec<&Node>> = None;
    for dimension in dimensions {
        let nodes = get_nodes_with_dimension(graph, dimension)?;
        common = Some(match common {
            Some(acc) => acc
                .into_iter()
                .filter(|n| nodes.iter().any(|m| m.name == n.name))
                .collect(),
            None => nodes,
        });
    }
    Ok(common.unwrap_or_default())
}
