//! TOML-based configuration for Junction.
//!
//! Declares the database catalog, the node graph, static schema data for the
//! verifier, and verifier options. String values in database URIs support
//! environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [[databases]]
//! id = 1
//! name = "warehouse"
//! uri = "postgresql://${WAREHOUSE_HOST}/analytics"
//! cost = 10.0
//!
//! [[nodes]]
//! name = "comments"
//! type = "source"
//! [[nodes.columns]]
//! name = "user_id"
//! type = "int"
//! dimension = "users"
//! [[nodes.tables]]
//! database = 1
//! schema = "public"
//! table = "comments"
//!
//! [[schemas]]
//! schema = "public"
//! table = "comments"
//! columns = ["id", "user_id", "text"]
//!
//! [verifier]
//! wildcard = "null"
//! # read columns from a SQLite file instead of [[schemas]]
//! # sqlite = "/var/lib/junction/schema.db"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::auth::{SchemaInspector, SchemaTable, SqliteInspector, StaticSchema, DEFAULT_PLACEHOLDER};
use crate::model::{Column, Database, Node, NodeGraph};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Databases nodes can be computed in.
    pub databases: Vec<Database>,

    /// Node catalog.
    pub nodes: Vec<Node>,

    /// Static column lists used by the verifier.
    pub schemas: Vec<SchemaTable>,

    /// Verifier configuration.
    pub verifier: VerifierSettings,
}

/// Verifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierSettings {
    /// Placeholder for unknown name parts; matches anything in permissions.
    pub wildcard: String,

    /// SQLite database to introspect instead of the declared schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<PathBuf>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            wildcard: DEFAULT_PLACEHOLDER.to_string(),
            sqlite: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse settings from TOML text, expanding database URIs.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        for database in &mut settings.databases {
            database.uri = expand_env_vars(&database.uri)?;
        }
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `JUNCTION_CONFIG`
    /// 2. `./junction.toml`
    /// 3. `~/.config/junction/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        match Self::discover() {
            Some(path) => Self::from_file(path),
            None => Ok(Settings::default()),
        }
    }

    /// Path of the config file [`Settings::load`] would read, if any.
    pub fn discover() -> Option<PathBuf> {
        if let Ok(path) = env::var("JUNCTION_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let local_config = PathBuf::from("junction.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("junction").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Build and validate the node graph.
    ///
    /// Nodes without declared columns take the columns of their first table.
    pub fn build_graph(&self) -> Result<NodeGraph, SettingsError> {
        let nodes = self
            .nodes
            .iter()
            .cloned()
            .map(|mut node| {
                if node.columns.is_empty() {
                    if let Some(table) = node.tables.first() {
                        node.columns = table
                            .columns
                            .iter()
                            .map(|name| Column::new(name.as_str(), Default::default()))
                            .collect();
                    }
                }
                node
            })
            .collect();
        Ok(NodeGraph::new(self.databases.clone(), nodes)?)
    }

    /// Schema information for the verifier.
    pub fn schema_inspector(&self) -> StaticSchema {
        StaticSchema::from(self.schemas.as_slice())
    }

    /// The inspector `verify` reads columns from: the `[verifier] sqlite`
    /// database when set, else the declared schemas.
    pub fn verifier_inspector(&self) -> crate::error::Result<Box<dyn SchemaInspector>> {
        match &self.verifier.sqlite {
            Some(path) => {
                debug!(path = %path.display(), "introspecting sqlite schema");
                Ok(Box::new(SqliteInspector::open(path)?))
            }
            None => Ok(Box::new(self.schema_inspector())),
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // lone $
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
