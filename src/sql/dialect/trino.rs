//! Trino (and Presto) SQL dialect.
//!
//! Trino addresses tables as `catalog.schema.table`, which is exactly the
//! physical location a node representation carries.

use super::helpers;
use super::SqlDialect;

/// Trino SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Trino;

impl SqlDialect for Trino {
    fn name(&self) -> &'static str {
        "trino"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_trino(name)
    }
}
