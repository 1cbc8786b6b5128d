//! SQL-level metric rewriter.
//!
//! Clients write queries against a virtual `metrics` table:
//!
//! ```text
//! SELECT num_comments, users.country FROM metrics WHERE users.age > 18
//! ```
//!
//! Metric names are replaced by their defining aggregate, `<node>.<column>`
//! references are bound to the metrics' parents or joined dimensions, and
//! the FROM clause is rebuilt over the physical relations.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument};

use super::relation::{bind_relations, parent_references, qualify_columns, JoinBuilder};
use super::QueryCreate;
use crate::dag::{get_database_for_nodes, get_dimensions, get_node_referenced_columns, ReferencedColumns};
use crate::error::{Error, Result};
use crate::model::{Node, NodeGraph};
use crate::sql::{
    parse_query, Column, Dialect, Expr, FromClause, Name, Relation, Select, Table, TableExpr,
};

/// Name of the virtual table metric queries select from.
pub const METRICS_TABLE: &str = "metrics";

/// A metric's aggregate, qualified against its own FROM clause.
struct Metric<'g> {
    node: &'g Node,
    expr: Expr,
    from: Option<FromClause>,
    references: HashMap<String, Name>,
}

fn load_metric<'g>(graph: &'g NodeGraph, node: &'g Node) -> Result<Metric<'g>> {
    let expression = node
        .expression
        .as_deref()
        .ok_or_else(|| Error::NotAMetric(node.name.clone()))?;
    let mut query = parse_query(expression, None)?;
    let references = qualify_columns(&mut query.select, &graph.parents(node))?;
    let Select {
        projection, from, ..
    } = query.select;
    let expr = projection
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidSql(format!("metric {} has no projection", node.name)))?
        .unaliased();
    Ok(Metric {
        node,
        expr,
        from,
        references,
    })
}

/// Point columns qualified by one of `own`'s parents at the name `target`
/// uses for the same parent.
fn retarget_columns(
    expr: &mut Expr,
    own: &HashMap<String, Name>,
    target: &HashMap<String, Name>,
) {
    expr.for_each_column_mut(&mut |column| {
        let Some(qualifier) = column.qualifier_name() else {
            return;
        };
        let owner = own
            .iter()
            .find(|(node, alias)| alias.value == qualifier || **node == qualifier)
            .and_then(|(node, _)| target.get(node));
        if let Some(reference) = owner {
            column.table = Some(Table::new(reference.clone()));
            column.namespace = None;
        }
    });
}

/// Drop `FROM metrics`; any other source is unsupported.
fn take_metrics_source(select: &mut Select) -> Result<()> {
    let Some(from) = select.from.take() else {
        return Ok(());
    };
    let is_metrics = match from.relations.as_slice() {
        [relation] => {
            relation.joins.is_empty()
                && matches!(
                    &relation.primary,
                    TableExpr::Table(table)
                        if table.namespace.is_none() && table.name.value == METRICS_TABLE
                )
        }
        _ => false,
    };
    if is_metrics {
        Ok(())
    } else {
        Err(Error::NotImplemented(format!(
            "FROM {}",
            from.to_tokens_for_dialect(Dialect::default())
                .serialize(Dialect::default())
        )))
    }
}

/// Split an unbound column into `(node, column)`.
///
/// Both `users.country` and the single quoted identifier `"users.country"`
/// name the same thing.
fn node_reference(column: &Column) -> Option<(String, String)> {
    match &column.namespace {
        Some(namespace) => Some((namespace.dotted(), column.name.value.clone())),
        None => column
            .name
            .value
            .rsplit_once('.')
            .map(|(node, name)| (node.to_string(), name.to_string())),
    }
}

/// With no metric, the single node referenced through `<node>.<column>`.
fn dimension_source<'g>(graph: &'g NodeGraph, select: &mut Select) -> Result<Option<&'g Node>> {
    let mut names = BTreeSet::new();
    for expr in select.exprs_mut() {
        expr.for_each_column_mut(&mut |column| {
            if column.table.is_none() {
                if let Some((node, _)) = node_reference(column) {
                    names.insert(node);
                }
            }
        });
    }
    let nodes = names
        .into_iter()
        .map(|name| graph.get(&name).ok_or(Error::InvalidIdentifier(name)))
        .collect::<Result<Vec<_>>>()?;
    match nodes.as_slice() {
        [] => Ok(None),
        [node] => Ok(Some(*node)),
        _ => Err(Error::MultipleDimensions),
    }
}

fn sorted_parents(node: &Node) -> Vec<&str> {
    let mut parents: Vec<&str> = node.parents.iter().map(String::as_str).collect();
    parents.sort_unstable();
    parents.dedup();
    parents
}

/// Rewrite metric SQL into SQL over physical relations.
#[instrument(skip_all)]
pub fn get_query_for_sql(
    graph: &NodeGraph,
    sql: &str,
    database_id: Option<i64>,
) -> Result<QueryCreate> {
    let mut query = parse_query(sql, None)?;
    if !query.ctes.is_empty() {
        return Err(Error::NotImplemented("WITH".into()));
    }
    let select = &mut query.select;
    take_metrics_source(select)?;

    let mut metrics: Vec<Metric> = vec![];
    let mut target: Option<HashMap<String, Name>> = None;
    let mut projection = Vec::with_capacity(select.projection.len());
    for item in std::mem::take(&mut select.projection) {
        let (alias, inner) = match item {
            Expr::Alias { alias, child } => (Some(alias), *child),
            other => (None, other),
        };
        let node = match &inner {
            Expr::Wildcard(_) => return Err(Error::NotImplemented("SELECT *".into())),
            Expr::Column(column) if column.table.is_none() => {
                let name = column.full_name();
                graph.get(&name).map(|node| (name, node))
            }
            _ => None,
        };

        match node {
            Some((name, node)) if node.is_metric() => {
                let mut metric = load_metric(graph, node)?;
                let target = target.get_or_insert_with(|| metric.references.clone());
                retarget_columns(&mut metric.expr, &metric.references, target);
                projection.push(Expr::Alias {
                    alias: alias.unwrap_or_else(|| Name::new(name)),
                    child: Box::new(metric.expr.clone()),
                });
                metrics.push(metric);
            }
            Some((_, node)) => return Err(Error::NotAMetric(node.name.clone())),
            None => projection.push(match alias {
                Some(alias) => Expr::Alias {
                    alias,
                    child: Box::new(inner),
                },
                None => inner,
            }),
        }
    }
    select.projection = projection;

    let parent_sets: BTreeSet<Vec<&str>> = metrics.iter().map(|m| sorted_parents(m.node)).collect();
    if parent_sets.len() > 1 {
        return Err(Error::ParentMismatch);
    }

    // metric names in HAVING and ORDER BY stand for their aggregate
    let aggregates: HashMap<String, Expr> = metrics
        .iter()
        .map(|m| (m.node.name.clone(), m.expr.clone()))
        .collect();
    let mut substitute = |expr: &mut Expr| -> Result<bool> {
        if let Expr::Column(column) = expr {
            if column.table.is_none() {
                if let Some(aggregate) = aggregates.get(&column.full_name()) {
                    *expr = aggregate.clone();
                }
            }
            return Ok(true);
        }
        Ok(false)
    };
    if let Some(having) = select.having.as_mut() {
        having.transform(&mut substitute)?;
    }
    for order in select.order_by.iter_mut() {
        order.expr.transform(&mut substitute)?;
    }

    let (parents, valid) = match metrics.first() {
        Some(metric) => {
            select.from = metric.from.clone();
            let valid: HashSet<String> = get_dimensions(graph, metric.node)?.into_iter().collect();
            (graph.parents(metric.node), valid)
        }
        None => match dimension_source(graph, select)? {
            Some(node) => {
                let table = Table::new(node.name.as_str());
                select.from = Some(FromClause::new(vec![Relation::new(TableExpr::Table(table))]));
                (vec![node], HashSet::new())
            }
            None => (vec![], HashSet::new()),
        },
    };
    let references = parent_references(select, &parents);

    let mut referenced = ReferencedColumns::new();
    for metric in &metrics {
        for (node, columns) in get_node_referenced_columns(graph, metric.node)? {
            referenced.entry(node).or_default().extend(columns);
        }
    }

    let aliases: HashSet<String> = select
        .projection
        .iter()
        .filter_map(Expr::alias_name)
        .map(|n| n.value.clone())
        .collect();
    let mut dimensions: Vec<String> = vec![];
    let mut resolve = |expr: &mut Expr| -> Result<bool> {
        let Expr::Column(column) = expr else {
            return Ok(false);
        };
        if column.table.is_some() {
            return Ok(true);
        }
        if column.namespace.is_none() && aliases.contains(&column.name.value) {
            return Ok(true);
        }
        let Some((node_name, column_name)) = node_reference(column) else {
            return Err(Error::InvalidIdentifier(column.name.value.clone()));
        };
        let full_name = format!("{}.{}", node_name, column_name);

        let reference = if let Some(parent) = parents.iter().find(|p| p.name == node_name) {
            if !parent.columns.is_empty() && !parent.has_column(&column_name) {
                return Err(Error::InvalidDimensions(vec![full_name]));
            }
            references
                .get(&node_name)
                .cloned()
                .unwrap_or_else(|| Name::new(&node_name))
        } else if valid.contains(&full_name) {
            if !dimensions.contains(&node_name) {
                dimensions.push(node_name.clone());
            }
            Name::new(&node_name)
        } else if graph.contains(&node_name) {
            return Err(Error::InvalidDimensions(vec![full_name]));
        } else {
            return Err(Error::InvalidIdentifier(node_name));
        };

        referenced
            .entry(node_name)
            .or_default()
            .insert(column_name.clone());
        if column.namespace.is_none() {
            column.name = Name::new(column_name);
        }
        column.namespace = None;
        column.table = Some(Table::new(reference));
        Ok(true)
    };
    for expr in select.exprs_mut() {
        expr.transform(&mut resolve)?;
    }

    let owner = metrics
        .first()
        .map(|m| m.node.name.clone())
        .unwrap_or_else(|| METRICS_TABLE.to_string());
    let mut nodes: Vec<&Node> = parents.clone();
    let mut paths = vec![];
    for dimension in &dimensions {
        let path = graph
            .dimension_path(&parents, dimension)
            .ok_or_else(|| Error::NoDimensionLink {
                node: owner.clone(),
                dimension: dimension.clone(),
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
            if !nodes.iter().any(|n| n.name == hop.dimension) {
                nodes.push(graph.node(&hop.dimension)?);
            }
        }
        paths.push(path);
    }
    debug!(?referenced, metrics = metrics.len(), "resolved metric query");

    let database = get_database_for_nodes(graph, &nodes, &referenced, database_id)?;
    let mut joins = JoinBuilder::new(graph, database, references);
    for path in &paths {
        joins.join_path(select, path)?;
    }
    bind_relations(graph, select, &parents, database)?;

    Ok(QueryCreate {
        database_id: database.id,
        submitted_query: query.to_sql(database.dialect()),
    })
}
