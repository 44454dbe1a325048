//! Table and column reference grammar.
//!
//! ```text
//! table_ref  := [source "."] table [alias_sep alias]
//! column_ref := expression [alias_sep alias]
//! alias_sep  := ws+ "as" ws+   (any case, last one outside parentheses and quotes)
//!             | ws+             (only between two bare identifiers)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static ALIAS_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+as\s+").expect("alias keyword pattern"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").expect("identifier pattern"));

/// A bare identifier: word characters and `$`, not purely numeric.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s) && !s.bytes().all(|b| b.is_ascii_digit())
}

/// Dotted chain of bare identifiers (`a`, `a.b`, `a.b.c`).
fn is_dotted_identifier(s: &str) -> bool {
    s.split('.').all(is_identifier)
}

/// Whether the end of `prefix` sits outside every parenthesis and quote.
fn is_top_level(prefix: &str) -> bool {
    let mut depth = 0i32;
    let mut quote = None;
    for c in prefix.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    depth == 0 && quote.is_none()
}

/// Split off an alias. The whitespace form only applies when `accept` holds
/// for the left-hand side and the right-hand side is a bare identifier.
fn split_alias(input: &str, accept: impl Fn(&str) -> bool) -> (&str, Option<&str>) {
    let keyword = ALIAS_KEYWORD
        .find_iter(input)
        .filter(|m| is_top_level(&input[..m.start()]))
        .last();
    if let Some(m) = keyword {
        let alias = input[m.end()..].trim();
        return (input[..m.start()].trim(), Some(alias).filter(|a| !a.is_empty()));
    }

    let mut parts = input.split_whitespace();
    if let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) {
        if accept(left) && is_identifier(right) {
            return (left, Some(right));
        }
    }
    (input, None)
}

/// Parsed `[source.]table[ [AS] alias]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub source: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableReference {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (name, alias) = split_alias(input, is_dotted_identifier);

        let (source, table) = match name.rsplit_once('.') {
            Some((source, table)) => (Some(source.trim()), table.trim()),
            None => (None, name),
        };
        if table.is_empty() {
            return Err(Error::malformed(format!("invalid table reference [{input}]")));
        }

        Ok(Self {
            source: source.filter(|s| !s.is_empty()).map(str::to_string),
            table: table.to_string(),
            alias: alias.map(str::to_string),
        })
    }

    /// Whether the reference carries a user alias.
    pub fn custom_alias(&self) -> bool {
        self.alias.is_some()
    }
}

/// Parsed `expression[ [AS] alias]` of a `fields` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    pub expression: String,
    pub alias: Option<String>,
}

impl ColumnReference {
    pub fn parse(input: &str) -> Self {
        let (expression, alias) = split_alias(input.trim(), |_| true);
        Self {
            expression: expression.to_string(),
            alias: alias.map(str::to_string),
        }
    }
}

/// A column reference split on dots, when every part is a bare identifier.
///
/// `name` gives one part, `table.name` two, `schema.table.name` three.
/// Anything else is an expression.
pub fn column_path(expression: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = expression.split('.').collect();
    (parts.len() <= 3 && parts.iter().all(|p| is_identifier(p))).then_some(parts)
}
