//! PostgreSQL.
//!
//! Parameters are `$n`. JSON parameters carry an explicit `::json` cast and
//! temporal columns are cast to text before LIKE.

use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn json_placeholder(&self, index: usize) -> String {
        format!("${index}::json")
    }

    fn text_cast(&self) -> Option<&'static str> {
        Some("::text")
    }
}
