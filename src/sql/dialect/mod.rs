//! Dialect rules.
//!
//! A dialect decides how identifiers are quoted, how placeholders look,
//! how a page of rows is requested, and a few capability checks:
//!
//! ```
//! use jsonql::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::from_product_name("PostgreSQL");
//! assert_eq!(dialect.quote_identifier("user"), "\"user\"");
//! assert_eq!(dialect.placeholder(2), "$2");
//! ```

mod ansi;
mod duckdb;
mod mysql;
mod postgres;
mod sqlite;
mod tsql;

pub use ansi::Ansi;
pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
pub use tsql::TSql;

use super::token::{Token, TokenStream};

pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"', '"')
    }

    /// Placeholder for the `index`-th (1-based) parameter.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Placeholder for a parameter bound to a JSON-typed column.
    fn json_placeholder(&self, index: usize) -> String {
        self.placeholder(index)
    }

    /// Suffix that turns a temporal column into text for LIKE.
    fn text_cast(&self) -> Option<&'static str> {
        None
    }

    /// `LIMIT n OFFSET m` unless overridden.
    fn pagination(&self, limit: u64, offset: u64) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.keyword("LIMIT")
            .space()
            .push(Token::Number(limit))
            .space()
            .keyword("OFFSET")
            .space()
            .push(Token::Number(offset));
        ts
    }

    /// Whether paging needs an ORDER BY clause to be valid.
    fn pagination_needs_order(&self) -> bool {
        false
    }

    fn supports_full_outer_join(&self) -> bool {
        true
    }

    /// When false, unknown tables become expression-only references.
    fn validates_table_exists(&self) -> bool {
        true
    }
}

/// Wrap `ident` in `open`/`close`, doubling any embedded `close`.
pub(crate) fn quote_with(ident: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push(open);
    for c in ident.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

/// `OFFSET m ROWS FETCH <word> n ROWS ONLY`.
pub(crate) fn offset_fetch(limit: u64, offset: u64, word: &'static str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.keyword("OFFSET")
        .space()
        .push(Token::Number(offset))
        .space()
        .keyword("ROWS FETCH")
        .space()
        .keyword(word)
        .space()
        .push(Token::Number(limit))
        .space()
        .keyword("ROWS ONLY");
    ts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    Ansi,
    DuckDb,
    TSql,
    MySql,
    Postgres,
    #[default]
    Sqlite,
}

impl Dialect {
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Ansi => &Ansi,
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::TSql => &TSql,
            Dialect::MySql => &MySql,
            Dialect::Sqlite => &Sqlite,
        }
    }

    /// Pick a dialect from a database product name or data source type.
    ///
    /// Unrecognized products fall back to [`Dialect::Ansi`].
    pub fn from_product_name(product: &str) -> Self {
        let product = product.to_lowercase();
        if product.contains("postgres") || product == "pg" {
            Dialect::Postgres
        } else if product.contains("mysql") || product.contains("mariadb") {
            Dialect::MySql
        } else if ["sql server", "sqlserver", "mssql"]
            .iter()
            .any(|p| product.contains(p))
            || product == "tsql"
        {
            Dialect::TSql
        } else if product.contains("sqlite") {
            Dialect::Sqlite
        } else if product.contains("duckdb") {
            Dialect::DuckDb
        } else {
            Dialect::Ansi
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn json_placeholder(&self, index: usize) -> String {
        self.dialect().json_placeholder(index)
    }

    fn text_cast(&self) -> Option<&'static str> {
        self.dialect().text_cast()
    }

    fn pagination(&self, limit: u64, offset: u64) -> TokenStream {
        self.dialect().pagination(limit, offset)
    }

    fn pagination_needs_order(&self) -> bool {
        self.dialect().pagination_needs_order()
    }

    fn supports_full_outer_join(&self) -> bool {
        self.dialect().supports_full_outer_join()
    }

    fn validates_table_exists(&self) -> bool {
        self.dialect().validates_table_exists()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
