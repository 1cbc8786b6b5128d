//! Query planning - compiles node requests and metric SQL into SQL text
//! for a chosen database.
//!
//! Two entry points:
//! 1. [`get_query_for_node`]: a node plus requested dimensions and filters
//! 2. [`get_query_for_sql`]: free-form SQL over the virtual `metrics` table

pub mod filter;
pub mod metric_sql;
pub mod node_query;
pub mod relation;

pub use filter::{parse_filter, Filter, FilterOp};
pub use metric_sql::{get_query_for_sql, METRICS_TABLE};
pub use node_query::get_query_for_node;
pub use relation::{get_select_for_node, node_relation, JoinBuilder};

use serde::{Deserialize, Serialize};

/// Compiled SQL and the database it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCreate {
    pub database_id: i64,
    pub submitted_query: String,
}
