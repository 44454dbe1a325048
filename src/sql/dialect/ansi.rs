//! Fallback for products the name lookup does not recognize.
//!
//! Table existence is not checked, so requests may name views or relations
//! the loaded schema does not list.

use super::{offset_fetch, SqlDialect};
use crate::sql::token::TokenStream;

#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn pagination(&self, limit: u64, offset: u64) -> TokenStream {
        offset_fetch(limit, offset, "FIRST")
    }

    fn validates_table_exists(&self) -> bool {
        false
    }
}
