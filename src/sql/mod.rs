//! SQL generation module.
//!
//! - [`expr`] / [`query`] - the typed AST
//! - [`parse`] - parser boundary and the generic parse tree
//! - [`translate`] - parser output to typed AST
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod parse;
pub mod query;
pub mod token;
pub mod translate;


// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    col, count_star, func, lit_bool, lit_float, lit_int, lit_null, lit_str, star, sum, table_col,
    BinaryOperator, Column, Expr, ExprExt, Literal, Name, Namespace, Table, UnaryOperator,
};
pub use parse::{parse_sql, ParseTree};
pub use query::{Cte, FromClause, Join, JoinKind, OrderBy, Query, Relation, Select, TableExpr};
pub use token::{Token, TokenStream};
pub use translate::{parse_query, translate_expr, translate_query};
