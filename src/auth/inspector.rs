//! Schema introspection - physical column names for a table.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Looks up the columns of a physical table.
pub trait SchemaInspector {
    /// Column names of `table`, optionally inside `schema`.
    fn columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<String>>;
}

/// Columns of one table, as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTable {
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

/// In-memory schema information.
///
/// A lookup with a schema falls back to the schema-less entry for the same
/// table.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<(Option<String>, String), Vec<String>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<S: Into<String>>(
        mut self,
        schema: Option<&str>,
        table: &str,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.insert(schema, table, columns);
        self
    }

    pub fn insert<S: Into<String>>(
        &mut self,
        schema: Option<&str>,
        table: &str,
        columns: impl IntoIterator<Item = S>,
    ) {
        self.tables.insert(
            (schema.map(str::to_string), table.to_string()),
            columns.into_iter().map(Into::into).collect(),
        );
    }
}

impl From<&[SchemaTable]> for StaticSchema {
    fn from(tables: &[SchemaTable]) -> Self {
        let mut schema = StaticSchema::new();
        for t in tables {
            schema.insert(t.schema.as_deref(), &t.table, t.columns.iter().cloned());
        }
        schema
    }
}

impl SchemaInspector for StaticSchema {
    fn columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<String>> {
        let key = (schema.map(str::to_string), table.to_string());
        self.tables
            .get(&key)
            .or_else(|| self.tables.get(&(None, table.to_string())))
            .cloned()
            .ok_or_else(|| {
                Error::Introspection(match schema {
                    Some(s) => format!("no columns known for {}.{}", s, table),
                    None => format!("no columns known for {}", table),
                })
            })
    }
}

/// Reads columns from a SQLite database with `pragma_table_info`.
pub struct SqliteInspector {
    conn: Connection,
}

impl SqliteInspector {
    /// Open an existing database file, read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl SchemaInspector for SqliteInspector {
    fn columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1, ?2) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table, schema.unwrap_or("main")], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        if columns.is_empty() {
            return Err(Error::Introspection(format!("table {} not found", table)));
        }
        Ok(columns)
    }
}
