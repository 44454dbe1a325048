//! Order tokenizer: `column`, `column asc|desc`, `+column`, `-column`.

use crate::error::{Error, Result};
use crate::sql::SortDir;

/// Split an order string into its column reference and direction.
///
/// Direction defaults to ascending.
pub fn parse_order(input: &str) -> Result<(String, SortDir)> {
    let input = input.trim();
    let invalid = || Error::InvalidOrder(input.to_string());

    let (column, dir) = if let Some(rest) = input.strip_prefix('-') {
        (rest, SortDir::Desc)
    } else if let Some(rest) = input.strip_prefix('+') {
        (rest, SortDir::Asc)
    } else {
        match input.rsplit_once(char::is_whitespace) {
            Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => (column, SortDir::Desc),
            Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => (column, SortDir::Asc),
            _ => (input, SortDir::Asc),
        }
    };

    let column = column.trim();
    if column.is_empty() {
        return Err(invalid());
    }
    Ok((column.to_string(), dir))
}
