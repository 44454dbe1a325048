//! DuckDB: double-quoted identifiers, `$n` placeholders.

use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }
}
