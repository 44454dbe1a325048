//! SQL rendering.
//!
//! The statement builder lowers actions onto the small AST in [`query`],
//! [`dml`] and [`expr`]; nodes write [`token`]s and the [`dialect`] decides
//! how each token is spelled.

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;


pub use dialect::{Dialect, SqlDialect};
pub use dml::{Delete, Insert, Update};
pub use expr::{BinaryOperator, Expr};
pub use query::{Join, JoinType, Page, Query, SelectItem, SortDir, TableRef, TableSource};
pub use token::{Token, TokenStream};
