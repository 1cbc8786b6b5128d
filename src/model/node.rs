//! Node definitions - the declared units of the semantic layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::database::Representation;

/// Kind of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Raw table from an upstream system, no expression.
    Source,
    /// Derived by a SQL expression over its parents.
    Transform,
    /// Attribute table other nodes link to through columns.
    Dimension,
    /// Single aggregate projection over its parents.
    Metric,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Source => "source",
            NodeType::Transform => "transform",
            NodeType::Dimension => "dimension",
            NodeType::Metric => "metric",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bytes,
    Str,
    Float,
    Int,
    Decimal,
    Bool,
    Datetime,
    Date,
    Time,
    Timedelta,
    List,
    Dict,
    #[default]
    Unknown,
}

/// A column owned by a node, optionally linked to a dimension node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type", default)]
    pub col_type: ColumnType,

    /// Name of the dimension node this column joins to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,

    /// Column on the dimension node to join on; `id` when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_column: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            dimension: None,
            dimension_column: None,
        }
    }

    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    pub fn with_dimension_column(mut self, column: impl Into<String>) -> Self {
        self.dimension_column = Some(column.into());
        self
    }

    /// Join column on the linked dimension.
    pub fn join_column(&self) -> &str {
        self.dimension_column.as_deref().unwrap_or("id")
    }
}

fn default_version() -> String {
    "1".into()
}

/// A declared node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub description: String,

    /// Defining SQL; absent for sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Nodes referenced by the expression, in declared order.
    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Physical materializations.
    #[serde(default)]
    pub tables: Vec<Representation>,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            node_type,
            description: String::new(),
            expression: None,
            parents: vec![],
            columns: vec![],
            tables: vec![],
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_parents<S: Into<String>>(mut self, parents: impl IntoIterator<Item = S>) -> Self {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_table(mut self, table: Representation) -> Self {
        self.tables.push(table);
        self
    }

    pub fn is_metric(&self) -> bool {
        self.node_type == NodeType::Metric
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns that link to `dimension`.
    pub fn columns_with_dimension<'a>(
        &'a self,
        dimension: &'a str,
    ) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns
            .iter()
            .filter(move |c| c.dimension.as_deref() == Some(dimension))
    }

    /// Cheapest materialization in a database.
    pub fn table_in(&self, database_id: i64) -> Option<&Representation> {
        self.tables
            .iter()
            .filter(|t| t.database_id == database_id)
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
    }
}
