//! NodeGraph - the validated node catalog.
//!
//! Nodes live in a petgraph arena with parent -> child edges. Parents are
//! looked up by name in declared order, so the arena never holds
//! back-references. Dimension links stay on the columns and are followed
//! by [`NodeGraph::dimension_path`].

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use super::database::Database;
use super::node::Node;
use crate::error::{Error, Result};

/// One join step from a node's column to a dimension node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionHop {
    pub from_node: String,
    pub column: String,
    pub dimension: String,
    pub dimension_column: String,
}

/// The node catalog plus the databases nodes are materialized in.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    graph: DiGraph<Node, ()>,
    node_indices: HashMap<String, NodeIndex>,
    databases: Vec<Database>,
}

impl NodeGraph {
    /// Build and validate the graph.
    ///
    /// Fails on duplicate names, unknown parents, dimensions or databases,
    /// and on parent cycles.
    pub fn new(databases: Vec<Database>, nodes: Vec<Node>) -> Result<Self> {
        let mut seen_ids = HashSet::new();
        for db in &databases {
            if !seen_ids.insert(db.id) {
                return Err(Error::InvalidGraph(format!("duplicate database id {}", db.id)));
            }
        }

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        for node in nodes {
            let name = node.name.clone();
            if node_indices.contains_key(&name) {
                return Err(Error::InvalidGraph(format!("duplicate node {}", name)));
            }
            let idx = graph.add_node(node);
            node_indices.insert(name, idx);
        }

        let mut edges = vec![];
        for idx in graph.node_indices() {
            let node = &graph[idx];
            for parent in &node.parents {
                let parent_idx = node_indices.get(parent).ok_or_else(|| {
                    Error::InvalidGraph(format!("node {} has unknown parent {}", node.name, parent))
                })?;
                edges.push((*parent_idx, idx));
            }
            for column in &node.columns {
                if let Some(dimension) = &column.dimension {
                    if !node_indices.contains_key(dimension) {
                        return Err(Error::InvalidGraph(format!(
                            "column {}.{} links to unknown dimension {}",
                            node.name, column.name, dimension
                        )));
                    }
                }
            }
            for table in &node.tables {
                if !seen_ids.contains(&table.database_id) {
                    return Err(Error::InvalidGraph(format!(
                        "node {} is materialized in unknown database {}",
                        node.name, table.database_id
                    )));
                }
            }
        }
        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(Error::InvalidGraph(format!(
                "cycle through node {}",
                graph[cycle.node_id()].name
            )));
        }

        debug!(
            nodes = graph.node_count(),
            databases = databases.len(),
            "built node graph"
        );

        Ok(Self {
            graph,
            node_indices,
            databases,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.node_indices.get(name).map(|idx| &self.graph[*idx])
    }

    /// Look up a node, failing with [`Error::UnknownNode`].
    pub fn node(&self, name: &str) -> Result<&Node> {
        self.get(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Parents of a node, in declared order.
    pub fn parents(&self, node: &Node) -> Vec<&Node> {
        node.parents.iter().filter_map(|p| self.get(p)).collect()
    }

    /// Direct children of a node, sorted by name.
    pub fn children(&self, name: &str) -> Result<Vec<&Node>> {
        let idx = self
            .node_indices
            .get(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))?;
        let mut children: Vec<&Node> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|child| &self.graph[child])
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children.dedup_by(|a, b| a.name == b.name);
        Ok(children)
    }

    /// Nodes ordered so that every parent precedes its children.
    pub fn topological_order(&self) -> Vec<&Node> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| &self.graph[idx]).collect())
            .unwrap_or_default()
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    /// Look up a database, failing with [`Error::InvalidDatabaseId`].
    pub fn database(&self, id: i64) -> Result<&Database> {
        self.databases
            .iter()
            .find(|db| db.id == id)
            .ok_or(Error::InvalidDatabaseId(id))
    }

    /// Shortest chain of dimension links from any of `start` to `dimension`.
    ///
    /// Start nodes are tried in order and columns in declared order, so the
    /// chosen path is deterministic. Returns `None` when unreachable.
    pub fn dimension_path(&self, start: &[&Node], dimension: &str) -> Option<Vec<DimensionHop>> {
        let mut visited: HashSet<&str> = start.iter().map(|n| n.name.as_str()).collect();
        let mut parents: HashMap<&str, DimensionHop> = HashMap::new();
        let mut queue: VecDeque<&Node> = start.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            for column in &current.columns {
                let Some(target) = column.dimension.as_deref() else {
                    continue;
                };
                if visited.contains(target) {
                    continue;
                }
                let Some(target_node) = self.get(target) else {
                    continue;
                };
                visited.insert(target_node.name.as_str());
                parents.insert(
                    target_node.name.as_str(),
                    DimensionHop {
                        from_node: current.name.clone(),
                        column: column.name.clone(),
                        dimension: target_node.name.clone(),
                        dimension_column: column.join_column().to_string(),
                    },
                );
                if target == dimension {
                    return Some(reconstruct_path(target_node.name.as_str(), &parents));
                }
                queue.push_back(target_node);
            }
        }
        None
    }
}

fn reconstruct_path(end: &str, parents: &HashMap<&str, DimensionHop>) -> Vec<DimensionHop> {
    let mut path = vec![];
    let mut current = end;
    while let Some(hop) = parents.get(current) {
        path.push(hop.clone());
        current = hop.from_node.as_str();
    }
    path.reverse();
    path
}
