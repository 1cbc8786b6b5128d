//! Error types shared by the compiler, resolver and verifier.
//!
//! Every failure is a value: nothing here is retried or recovered locally,
//! and the message always names the offending node, column or value.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric error codes, grouped by area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    UnknownError = 0,
    NotImplementedError = 1,
    AlreadyExists = 2,

    // filters
    InvalidFilterPattern = 100,
    InvalidColumnInFilter = 101,
    InvalidValueInFilter = 102,

    // SQL building
    InvalidArgumentsToFunction = 200,
    InvalidSqlQuery = 201,
    MissingColumns = 202,
    UnknownNode = 203,
    NodeTypeError = 204,
    InvalidDimensionJoin = 205,
    InvalidColumn = 206,

    // SQL build compound errors
    CompoundBuildException = 300,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid column name: {0}")]
    InvalidColumnName(String),

    #[error("Invalid operation: {op} (valid: {valid})")]
    InvalidOperation { op: String, valid: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Requested dimensions that the node cannot reach, sorted.
    #[error("Invalid dimension{}: {}", plural(.0), .0.join(", "))]
    InvalidDimensions(Vec<String>),

    #[error("Column {0} not found in any parent")]
    ColumnNotFound(String),

    #[error("Column {0} is ambiguous")]
    AmbiguousColumn(String),

    #[error("Node {node} has no columns with dimension {dimension}")]
    NoDimensionLink { node: String, dimension: String },

    #[error("No valid database was found")]
    NoValidDatabase,

    #[error("Database ID {0} is not valid")]
    InvalidDatabaseId(i64),

    #[error("Not a valid metric: {0}")]
    NotAMetric(String),

    #[error("All metrics should have the same parents")]
    ParentMismatch,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Cannot query from multiple dimensions when no metric is specified")]
    MultipleDimensions,

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Column {0} not found in any table")]
    ColumnNotInAnyTable(String),

    #[error("Column {0} present is ambiguous")]
    AmbiguousTableColumn(String),

    #[error("Unable to handle expression: {0}")]
    NotImplemented(String),

    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    #[error("SQL parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("Parse tree conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema introspection failed: {0}")]
    Introspection(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
}

impl Error {
    /// Numeric code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidFilter(_) => ErrorCode::InvalidFilterPattern,
            Error::InvalidColumnName(_) => ErrorCode::InvalidColumnInFilter,
            Error::InvalidOperation { .. } => ErrorCode::InvalidFilterPattern,
            Error::InvalidValue(_) => ErrorCode::InvalidValueInFilter,
            Error::InvalidDimensions(_) => ErrorCode::InvalidDimensionJoin,
            Error::ColumnNotFound(_) | Error::ColumnNotInAnyTable(_) => ErrorCode::MissingColumns,
            Error::AmbiguousColumn(_) | Error::AmbiguousTableColumn(_) => ErrorCode::InvalidColumn,
            Error::NoDimensionLink { .. } => ErrorCode::InvalidDimensionJoin,
            Error::NoValidDatabase | Error::InvalidDatabaseId(_) => ErrorCode::UnknownError,
            Error::NotAMetric(_) => ErrorCode::NodeTypeError,
            Error::ParentMismatch | Error::MultipleDimensions => {
                ErrorCode::CompoundBuildException
            }
            Error::InvalidIdentifier(_) => ErrorCode::InvalidColumn,
            Error::UnknownNode(_) => ErrorCode::UnknownNode,
            Error::NotImplemented(_) => ErrorCode::NotImplementedError,
            Error::InvalidSql(_) | Error::Parse(_) | Error::Json(_) => ErrorCode::InvalidSqlQuery,
            Error::Introspection(_) | Error::Sqlite(_) => ErrorCode::UnknownError,
            Error::InvalidGraph(_) => ErrorCode::UnknownError,
        }
    }

    pub(crate) fn not_implemented(what: impl std::fmt::Debug) -> Self {
        Error::NotImplemented(format!("{:?}", what))
    }
}

fn plural(items: &[String]) -> &'static str {
    if items.len() > 1 {
        "s"
    } else {
        ""
    }
}
