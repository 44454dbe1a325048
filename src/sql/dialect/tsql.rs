//! SQL Server.
//!
//! Bracketed identifiers, `@pn` parameters, and OFFSET/FETCH paging, which
//! is only valid after an ORDER BY.

use super::{offset_fetch, quote_with, SqlDialect};
use crate::sql::token::TokenStream;

#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '[', ']')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{index}")
    }

    fn pagination(&self, limit: u64, offset: u64) -> TokenStream {
        offset_fetch(limit, offset, "NEXT")
    }

    fn pagination_needs_order(&self) -> bool {
        true
    }
}
