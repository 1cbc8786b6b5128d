//! Query synthesizer - SQL for a node grouped and filtered by dimensions.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use super::filter::{parse_filter, Filter};
use super::relation::{get_select_for_node, parent_references, reference_column, JoinBuilder};
use super::QueryCreate;
use crate::dag::{get_database_for_nodes, get_dimensions, get_node_referenced_columns};
use crate::error::{Error, Result};
use crate::model::{Node, NodeGraph};
use crate::sql::{parse_query, Expr};

/// Compile `node` grouped by `groupbys` and restricted by `filters`.
///
/// Every group-by and filter must name a dimension reachable from the node.
/// The node's own materialization is only read when nothing is requested.
#[instrument(skip_all, fields(node = %node.name))]
pub fn get_query_for_node(
    graph: &NodeGraph,
    node: &Node,
    groupbys: &[String],
    filters: &[String],
    database_id: Option<i64>,
) -> Result<QueryCreate> {
    let filters = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<Filter>>>()?;

    let requested: BTreeSet<&str> = groupbys
        .iter()
        .map(String::as_str)
        .chain(filters.iter().map(|f| f.name.as_str()))
        .collect();
    let valid: BTreeSet<String> = get_dimensions(graph, node)?.into_iter().collect();
    let invalid: Vec<String> = requested
        .iter()
        .filter(|d| !valid.contains(**d))
        .map(|d| d.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(Error::InvalidDimensions(invalid));
    }

    // dimensions resolve against the parents, or the node itself for sources
    let parents = graph.parents(node);
    let start: Vec<&Node> = if parents.is_empty() {
        vec![node]
    } else {
        parents
    };

    let mut referenced = get_node_referenced_columns(graph, node)?;
    let mut participating: Vec<&Node> = start.clone();
    let mut paths = vec![];
    for dimension in &requested {
        let (name, column) = dimension
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidColumnName(dimension.to_string()))?;
        referenced
            .entry(name.to_string())
            .or_default()
            .insert(column.to_string());
        if start.iter().any(|n| n.name == name) {
            continue;
        }
        let path = graph
            .dimension_path(&start, name)
            .ok_or_else(|| Error::NoDimensionLink {
                node: node.name.clone(),
                dimension: name.to_string(),
            })?;
        for hop in &path {
            referenced
                .entry(hop.from_node.clone())
                .or_default()
                .insert(hop.column.clone());
            referenced
                .entry(hop.dimension.clone())
                .or_default()
                .insert(hop.dimension_column.clone());
            if !participating.iter().any(|n| n.name == hop.dimension) {
                participating.push(graph.node(&hop.dimension)?);
            }
        }
        paths.push(path);
    }
    debug!(?referenced, "referenced columns");

    let use_materialized = requested.is_empty();
    let nodes: Vec<&Node> = if use_materialized {
        vec![node]
    } else {
        participating
    };
    let database = get_database_for_nodes(graph, &nodes, &referenced, database_id)?;

    let mut query = get_select_for_node(graph, node, database, use_materialized)?;
    let select = &mut query.select;
    // binding renames parent tables, so aliases come from the unbound expression
    let parents = graph.parents(node);
    let references = match &node.expression {
        Some(expression) => parent_references(&parse_query(expression, None)?.select, &parents),
        None => parent_references(select, &parents),
    };
    let mut joins = JoinBuilder::new(graph, database, references);
    for path in &paths {
        joins.join_path(select, path)?;
    }

    for filter in &filters {
        let (name, column) = filter.dimension()?;
        select.add_filter(filter.to_expr(reference_column(&joins.reference(name), column)));
    }

    for groupby in groupbys {
        let (name, column) = groupby
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidColumnName(groupby.clone()))?;
        let expr = Expr::Column(reference_column(&joins.reference(name), column));
        if !select.projection.contains(&expr) {
            select.projection.push(expr.clone());
        }
        if !select.group_by.contains(&expr) {
            select.group_by.push(expr);
        }
    }

    let dialect = database.dialect();
    Ok(QueryCreate {
        database_id: database.id,
        submitted_query: query.to_sql(dialect),
    })
}
