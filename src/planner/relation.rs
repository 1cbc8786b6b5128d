//! Node relations - how a node appears in a FROM clause for a database.
//!
//! A node materialized in the database becomes a table reference, aliased
//! to the node name when the qualified physical name differs. Anything else becomes a
//! derived table built from its expression, recursively.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Database, DimensionHop, Node, NodeGraph};
use crate::sql::{
    col, parse_query, star, Column, Expr, ExprExt, FromClause, Join, JoinKind, Name, Query,
    Relation, Select, Table, TableExpr,
};

/// Relation for `node` in `database`.
///
/// An explicit `alias` wins over the node-name alias.
pub fn node_relation(
    graph: &NodeGraph,
    node: &Node,
    database: &Database,
    alias: Option<Name>,
) -> Result<TableExpr> {
    if let Some(rep) = node.table_in(database.id) {
        let mut table = rep.to_table();
        let unaliased = table.full_name() == node.name;
        table.alias = alias.or_else(|| (!unaliased).then(|| Name::new(&node.name)));
        return Ok(TableExpr::Table(table));
    }

    let query = get_select_for_node(graph, node, database, false)?;
    Ok(TableExpr::Subquery {
        query: Box::new(query),
        alias: Some(alias.unwrap_or_else(|| Name::new(&node.name))),
    })
}

/// SELECT computing `node` in `database`.
///
/// With `use_materialized` the node's own table is preferred; otherwise
/// the expression is compiled over its parents. Sources always read their
/// table.
pub fn get_select_for_node(
    graph: &NodeGraph,
    node: &Node,
    database: &Database,
    use_materialized: bool,
) -> Result<Query> {
    if use_materialized || node.expression.is_none() {
        if let Some(rep) = node.table_in(database.id) {
            let columns: Vec<&str> = if rep.columns.is_empty() {
                node.columns.iter().map(|c| c.name.as_str()).collect()
            } else {
                rep.columns.iter().map(String::as_str).collect()
            };
            let projection = if columns.is_empty() {
                vec![star()]
            } else {
                columns.into_iter().map(col).collect()
            };
            let relation = node_relation(graph, node, database, None)?;
            let mut select = Select::new(projection);
            select.from = Some(FromClause::new(vec![Relation::new(relation)]));
            return Ok(Query::new(select));
        }
    }

    let expression = node
        .expression
        .as_deref()
        .ok_or(Error::NoValidDatabase)?;
    let mut query = parse_query(expression, None)?;
    let parents = graph.parents(node);
    qualify_columns(&mut query.select, &parents)?;
    bind_relations(graph, &mut query.select, &parents, database)?;
    Ok(query)
}

/// Name each parent is referred to by in `select`: its alias if the FROM
/// clause gives one, else the node name.
pub fn parent_references(select: &Select, parents: &[&Node]) -> HashMap<String, Name> {
    let mut refs = HashMap::new();
    for table_expr in select.table_exprs() {
        if let TableExpr::Table(table) = table_expr {
            let full_name = table.full_name();
            if let Some(parent) = parents.iter().find(|p| p.name == full_name) {
                refs.insert(
                    parent.name.clone(),
                    table.alias.clone().unwrap_or_else(|| Name::new(&parent.name)),
                );
            }
        }
    }
    refs
}

/// Attach the owning parent to every bare column.
///
/// Columns that match no parent are left alone (they may name a projection
/// alias); a column present in several parents is ambiguous.
pub fn qualify_columns(select: &mut Select, parents: &[&Node]) -> Result<HashMap<String, Name>> {
    let refs = parent_references(select, parents);
    let in_scope: Vec<(&Node, &Name)> = parents
        .iter()
        .filter_map(|p| refs.get(&p.name).map(|r| (*p, r)))
        .collect();

    let mut qualify = |expr: &mut Expr| -> Result<bool> {
        let Expr::Column(column) = expr else {
            return Ok(false);
        };
        if column.is_qualified() {
            return Ok(true);
        }
        let owners: Vec<&Name> = in_scope
            .iter()
            .filter(|(p, _)| p.has_column(&column.name.value))
            .map(|(_, r)| *r)
            .collect();
        match owners.as_slice() {
            [] => {}
            [owner] => column.add_table(Table::new((*owner).clone())),
            _ => return Err(Error::AmbiguousColumn(column.name.value.clone())),
        }
        Ok(true)
    };

    for expr in select.exprs_mut() {
        expr.transform(&mut qualify)?;
    }
    for on in select.join_conditions_mut() {
        on.transform(&mut qualify)?;
    }
    Ok(refs)
}

/// Replace parent tables in FROM with their relations in `database`.
pub fn bind_relations(
    graph: &NodeGraph,
    select: &mut Select,
    parents: &[&Node],
    database: &Database,
) -> Result<()> {
    for table_expr in select.table_exprs_mut() {
        let TableExpr::Table(table) = table_expr else {
            continue;
        };
        let full_name = table.full_name();
        if let Some(parent) = parents.iter().find(|p| p.name == full_name) {
            *table_expr = node_relation(graph, parent, database, table.alias.clone())?;
        }
    }
    Ok(())
}

/// A column owned by the relation referred to as `reference`.
pub fn reference_column(reference: &Name, column: &str) -> Column {
    let mut c = Column::new(column);
    c.add_table(Table::new(reference.clone()));
    c
}

fn holds_reference(relation: &Relation, reference: &Name) -> bool {
    relation.primary.reference_name() == Some(reference)
        || relation
            .joins
            .iter()
            .any(|join| join.relation.reference_name() == Some(reference))
}

/// Chains dimension joins onto the FROM entry holding the node they hang off.
pub struct JoinBuilder<'a> {
    graph: &'a NodeGraph,
    database: &'a Database,
    references: HashMap<String, Name>,
    joined: HashSet<String>,
}

impl<'a> JoinBuilder<'a> {
    pub fn new(
        graph: &'a NodeGraph,
        database: &'a Database,
        references: HashMap<String, Name>,
    ) -> Self {
        let joined = references.keys().cloned().collect();
        Self {
            graph,
            database,
            references,
            joined,
        }
    }

    /// How `node` is referred to in the query being built.
    pub fn reference(&self, node: &str) -> Name {
        self.references
            .get(node)
            .cloned()
            .unwrap_or_else(|| Name::new(node))
    }

    /// Join every hop of `path` not already present.
    pub fn join_path(&mut self, select: &mut Select, path: &[DimensionHop]) -> Result<()> {
        for hop in path {
            if self.joined.contains(&hop.dimension) {
                continue;
            }
            let dimension = self.graph.node(&hop.dimension)?;
            let relation = node_relation(self.graph, dimension, self.database, None)?;
            let from = self.reference(&hop.from_node);
            let on = Expr::Column(reference_column(&from, &hop.column)).eq(Expr::Column(
                reference_column(&self.reference(&hop.dimension), &hop.dimension_column),
            ));

            let relations = select
                .from
                .as_mut()
                .map(|f| &mut f.relations)
                .filter(|relations| !relations.is_empty())
                .ok_or_else(|| Error::InvalidSql("no FROM clause to join onto".into()))?;
            // the ON clause only sees the comma-separated entry holding `from`
            let position = relations
                .iter()
                .position(|r| holds_reference(r, &from))
                .unwrap_or(0);
            relations[position]
                .joins
                .push(Join::new(JoinKind::Inner, relation, Some(on)));

            debug!(
                from = %hop.from_node,
                column = %hop.column,
                dimension = %hop.dimension,
                "joined dimension"
            );
            self.joined.insert(hop.dimension.clone());
        }
        Ok(())
    }
}
