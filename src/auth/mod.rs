//! Access control - identifier qualification and permission checks.

pub mod inspector;
pub mod qualify;
pub mod verify;

pub use inspector::{SchemaInspector, SchemaTable, SqliteInspector, StaticSchema};
pub use qualify::{prepare_tree, QualifierContext, DEFAULT_PLACEHOLDER};
pub use verify::{parse_permission, table_matches, verify_query, PermissionPattern};
