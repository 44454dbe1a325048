//! MySQL and MariaDB: backtick identifiers, no FULL OUTER JOIN.

use super::{quote_with, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`', '`')
    }

    fn supports_full_outer_join(&self) -> bool {
        false
    }
}
