//! # Junction
//!
//! A metrics semantic layer that compiles node definitions to dialect SQL
//! and checks SQL against table permissions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Catalog (databases, nodes, representations)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [model::NodeGraph]
//! ┌─────────────────────────────────────────────────────────┐
//! │   DAG resolver (columns, dimensions, database choice)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Typed SQL AST  ──render──▶  SQL for the target dialect│
//! └─────────────────────────────────────────────────────────┘
//!
//! SQL text ──parse──▶ parse tree ──[auth::prepare_tree]──▶ qualified tree
//!                                   └──[auth::verify_query]──▶ allowed?
//! ```

pub mod auth;
pub mod config;
pub mod dag;
pub mod error;
pub mod model;
pub mod planner;
pub mod sql;

pub use error::{Error, ErrorCode, Result};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::auth::{verify_query, QualifierContext, SchemaInspector, StaticSchema};
    pub use crate::model::{Column, ColumnType, Database, Node, NodeGraph, NodeType, Representation};
    pub use crate::planner::{get_query_for_node, get_query_for_sql, QueryCreate};
    pub use crate::sql::{
        col, count_star, func, lit_bool, lit_int, lit_str, star, sum, table_col, Dialect, Expr,
        ExprExt, Query, Select,
    };
}
