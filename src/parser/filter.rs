//! Filter condition tokenizer.
//!
//! A condition is written `<column><op><value>`. The tokenizer scans left to
//! right and stops at the first complete operator:
//!
//! | symbol | operator | value shape |
//! |--------|----------|-------------|
//! | `==`   | strong equal | scalar |
//! | `=`    | equal, or IN (`a,b`), BETWEEN (`a~b`), IS NULL (`null`) | per operator |
//! | `!=`   | not equal, or NOT IN (`a,b`), IS NOT NULL (`null`) | per operator |
//! | `!%=`  | not like | scalar |
//! | `%=`   | like | scalar |
//! | `>` `>=` `<` `<=` | comparison | scalar |

use crate::action::{FilterValue, Operator};
use crate::error::{Error, Result};

/// A tokenized filter condition. The column is still an unresolved reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: FilterValue,
}

/// Operator symbol recognized by the scanner, before the value refines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Eq,
    StrongEq,
    NotEq,
    NotLike,
    Like,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Scan,
    Eq(usize),
    Bang(usize),
    BangPercent(usize),
    Gt(usize),
    Lt(usize),
    Percent(usize),
}

/// Byte span of the operator inside the input.
struct Match {
    symbol: Symbol,
    start: usize,
    end: usize,
}

/// Tokenize one filter string.
pub fn parse_condition(input: &str) -> Result<Condition> {
    let input = input.trim();
    let invalid = || Error::InvalidFilter(input.to_string());

    let found = scan(input).ok_or_else(invalid)?;
    let column = input[..found.start].trim();
    let tail = input[found.end..].trim();
    if column.is_empty() {
        return Err(invalid());
    }

    let is_null = tail.eq_ignore_ascii_case("null");
    let operator = match found.symbol {
        Symbol::StrongEq => Operator::StrongEqual,
        Symbol::Eq if tail.contains(',') => Operator::In,
        Symbol::Eq if tail.contains('~') => Operator::Between,
        Symbol::Eq if is_null => Operator::Null,
        Symbol::Eq => Operator::Equal,
        Symbol::NotEq if tail.contains(',') => Operator::NotIn,
        Symbol::NotEq if is_null => Operator::NotNull,
        Symbol::NotEq => Operator::NotEqual,
        Symbol::NotLike => Operator::NotLike,
        Symbol::Like => Operator::Like,
        Symbol::Gt => Operator::Gt,
        Symbol::Gte => Operator::Gte,
        Symbol::Lt => Operator::Lt,
        Symbol::Lte => Operator::Lte,
    };

    let value = match operator {
        Operator::Null | Operator::NotNull => FilterValue::None,
        Operator::In | Operator::NotIn => FilterValue::Many(split_values(tail, ',')),
        Operator::Between => {
            let values = split_values(tail, '~');
            if values.len() != 2 {
                return Err(invalid());
            }
            FilterValue::Many(values)
        }
        _ => FilterValue::Single(tail.to_string()),
    };

    Ok(Condition {
        column: column.to_string(),
        operator,
        value,
    })
}

fn split_values(tail: &str, separator: char) -> Vec<String> {
    tail.split(separator).map(|v| v.trim().to_string()).collect()
}

fn scan(input: &str) -> Option<Match> {
    let found = |symbol, start, end| Some(Match { symbol, start, end });
    let mut state = State::Scan;

    for (i, ch) in input.char_indices() {
        state = match (state, ch) {
            (State::Scan, '=') => State::Eq(i),
            (State::Scan, '!') => State::Bang(i),
            (State::Scan, '>') => State::Gt(i),
            (State::Scan, '<') => State::Lt(i),
            (State::Scan, '%') => State::Percent(i),
            (State::Scan, _) => State::Scan,

            (State::Eq(s), '=') => return found(Symbol::StrongEq, s, i + 1),
            (State::Eq(s), _) => return found(Symbol::Eq, s, i),

            (State::Bang(s), '=') => return found(Symbol::NotEq, s, i + 1),
            (State::Bang(s), '%') => State::BangPercent(s),
            // The character after `!` is consumed.
            (State::Bang(_), _) => State::Scan,

            (State::BangPercent(s), '=') => return found(Symbol::NotLike, s, i + 1),
            (State::BangPercent(_), _) => return None,

            (State::Gt(s), '=') => return found(Symbol::Gte, s, i + 1),
            (State::Gt(s), _) => return found(Symbol::Gt, s, i),

            (State::Lt(s), '=') => return found(Symbol::Lte, s, i + 1),
            (State::Lt(s), _) => return found(Symbol::Lt, s, i),

            (State::Percent(s), '=') => return found(Symbol::Like, s, i + 1),
            (State::Percent(_), _) => State::Scan,
        };
    }

    // Input ended right after a one-character operator.
    let end = input.len();
    match state {
        State::Eq(s) => found(Symbol::Eq, s, end),
        State::Gt(s) => found(Symbol::Gt, s, end),
        State::Lt(s) => found(Symbol::Lt, s, end),
        _ => None,
    }
}
