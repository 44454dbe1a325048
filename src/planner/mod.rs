//! Action planning: join resolution and statement rendering.
//!
//! Two stages sit between a parsed request and the backend:
//! 1. [`JoinBuilder`]: picks relationship paths for the requested joins and
//!    adds the join items to the action.
//! 2. [`StatementBuilder`]: lowers the finished action to the SQL builder
//!    and renders it for the action's dialect with bound parameters.

pub mod join_builder;
pub mod statement;

pub use join_builder::{JoinBuilder, JoinRequest};
pub use statement::StatementBuilder;
