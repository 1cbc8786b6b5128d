//! Node catalog types.

pub mod database;
pub mod graph;
pub mod node;

pub use database::{Database, Representation};
pub use graph::{DimensionHop, NodeGraph};
pub use node::{Column, ColumnType, Node, NodeType};
