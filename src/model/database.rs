//! Databases and physical representations of nodes.

use serde::{Deserialize, Serialize};

use crate::sql::{Dialect, Namespace, Table};

/// A queryable backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: i64,
    pub name: String,
    pub uri: String,
    /// Relative cost; lower is preferred.
    #[serde(default = "default_cost")]
    pub cost: f64,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    #[serde(default)]
    pub description: String,
}

fn default_cost() -> f64 {
    1.0
}

fn default_read_only() -> bool {
    true
}

impl Database {
    pub fn new(id: i64, name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            uri: uri.into(),
            cost: default_cost(),
            read_only: default_read_only(),
            description: String::new(),
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// The dialect queries for this database compile to.
    pub fn dialect(&self) -> Dialect {
        Dialect::from_uri(&self.uri)
    }
}

/// A node materialized as a physical table in one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    #[serde(rename = "database", alias = "database_id")]
    pub database_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default = "default_cost")]
    pub cost: f64,
    /// Physical columns present in the table.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl Representation {
    pub fn new(database_id: i64, table: impl Into<String>) -> Self {
        Self {
            database_id,
            catalog: None,
            schema: None,
            table: table.into(),
            cost: default_cost(),
            columns: vec![],
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Table reference as `[catalog.][schema.]table`.
    pub fn to_table(&self) -> Table {
        let parts: Vec<&str> = self
            .catalog
            .iter()
            .chain(self.schema.iter())
            .map(String::as_str)
            .collect();
        Table::new(self.table.as_str()).with_namespace(Namespace::from_parts(&parts))
    }
}
