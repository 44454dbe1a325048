//! SQLite. Every default applies; FULL OUTER JOIN needs 3.39 or later.

use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }
}
