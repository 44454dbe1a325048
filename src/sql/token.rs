//! Output tokens.
//!
//! Statements lower to a flat token stream first. Only identifiers,
//! placeholders and pagination differ between dialects, so those are the
//! tokens that consult the [`Dialect`] when written.

use std::fmt::Write;

use super::dialect::{Dialect, SqlDialect};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved word, written as given.
    Keyword(&'static str),
    /// Punctuation or operator, written as given.
    Symbol(&'static str),
    Space,
    Newline,
    Indent(usize),
    Ident(String),
    /// `schema.name`, or `name` alone.
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    /// Row counts in pagination clauses.
    Number(u64),
    /// Positional parameter, 1-based.
    Param(usize),
    /// Positional parameter bound to a JSON-typed column.
    JsonParam(usize),
    /// Trusted SQL text: dialect syntax or a guarded column expression.
    /// Request values never travel here.
    Raw(String),
}

impl Token {
    fn write_to(&self, out: &mut String, dialect: Dialect) {
        match self {
            Token::Keyword(s) | Token::Symbol(s) => out.push_str(s),
            Token::Space => out.push(' '),
            Token::Newline => out.push('\n'),
            Token::Indent(n) => (0..*n).for_each(|_| out.push_str("  ")),
            Token::Ident(name) => out.push_str(&dialect.quote_identifier(name)),
            Token::QualifiedIdent { schema, name } => {
                if let Some(schema) = schema {
                    out.push_str(&dialect.quote_identifier(schema));
                    out.push('.');
                }
                out.push_str(&dialect.quote_identifier(name));
            }
            Token::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Token::Param(index) => out.push_str(&dialect.placeholder(*index)),
            Token::JsonParam(index) => out.push_str(&dialect.json_placeholder(*index)),
            Token::Raw(s) => out.push_str(s),
        }
    }
}

/// Tokens in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn append(&mut self, other: TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens);
        self
    }

    pub fn keyword(&mut self, word: &'static str) -> &mut Self {
        self.push(Token::Keyword(word))
    }

    pub fn symbol(&mut self, symbol: &'static str) -> &mut Self {
        self.push(Token::Symbol(symbol))
    }

    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.push(Token::Ident(name.to_string()))
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }

    pub fn indent(&mut self, depth: usize) -> &mut Self {
        self.push(Token::Indent(depth))
    }

    /// Write `items` separated by `", "`.
    pub fn comma_list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) -> &mut Self {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.symbol(",").space();
            }
            each(self, item);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            token.write_to(&mut out, dialect);
        }
        out
    }
}
