//! Expressions for the WHERE, ON, SELECT, GROUP BY and ORDER BY clauses.
//!
//! There is no literal variant: request values only reach a statement as
//! [`Expr::Param`] slots whose values travel beside the SQL text.

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `[table.]column`
    Column {
        table: Option<String>,
        column: String,
    },
    /// Positional parameter, 1-based.
    Param(usize),
    /// Positional parameter bound to a JSON-typed column.
    JsonParam(usize),
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Star,
    CountStar,
    Paren(Box<Expr>),
    /// Temporal column compared as text, for LIKE.
    TimeLike(Box<Expr>),
    /// Trusted SQL text. Only column expressions that passed the expression
    /// guard end up here, never request values.
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Like,
}

impl BinaryOperator {
    fn token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Symbol("="),
            BinaryOperator::Ne => Token::Symbol("<>"),
            BinaryOperator::Lt => Token::Symbol("<"),
            BinaryOperator::Gt => Token::Symbol(">"),
            BinaryOperator::Lte => Token::Symbol("<="),
            BinaryOperator::Gte => Token::Symbol(">="),
            BinaryOperator::And => Token::Keyword("AND"),
            BinaryOperator::Or => Token::Keyword("OR"),
            BinaryOperator::Like => Token::Keyword("LIKE"),
        }
    }
}

impl Expr {
    pub fn column(table: &str, column: &str) -> Self {
        Expr::Column {
            table: Some(table.to_string()),
            column: column.to_string(),
        }
    }

    pub fn raw(sql: &str) -> Self {
        Expr::Raw(sql.to_string())
    }

    pub fn binary(self, op: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn and(self, right: Expr) -> Self {
        self.binary(BinaryOperator::And, right)
    }

    pub fn or(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Or, right)
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn paren(self) -> Self {
        Expr::Paren(Box::new(self))
    }

    pub fn null_check(self, negated: bool) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated,
        }
    }

    pub fn in_list(self, values: Vec<Expr>, negated: bool) -> Self {
        Expr::In {
            expr: Box::new(self),
            values,
            negated,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    /// Top-level OR, which needs parentheses before an AND is appended.
    pub fn is_or(&self) -> bool {
        matches!(
            self,
            Expr::Binary {
                op: BinaryOperator::Or,
                ..
            }
        )
    }

    pub fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        match self {
            Expr::Column { table, column } => {
                if let Some(table) = table {
                    ts.ident(table).symbol(".");
                }
                ts.ident(column);
            }
            Expr::Param(index) => {
                ts.push(Token::Param(*index));
            }
            Expr::JsonParam(index) => {
                ts.push(Token::JsonParam(*index));
            }
            Expr::Binary { left, op, right } => {
                left.write(ts, dialect);
                ts.space().push(op.token()).space();
                right.write(ts, dialect);
            }
            Expr::Not(inner) => {
                ts.keyword("NOT").space();
                inner.write(ts, dialect);
            }
            // An empty list never matches; both forms stay valid SQL.
            Expr::In { values, negated, .. } if values.is_empty() => {
                ts.push(Token::Raw(if *negated { "1 = 1" } else { "1 = 0" }.into()));
            }
            Expr::In {
                expr,
                values,
                negated,
            } => {
                expr.write(ts, dialect);
                if *negated {
                    ts.space().keyword("NOT");
                }
                ts.space().keyword("IN").space().symbol("(");
                ts.comma_list(values, |ts, v| v.write(ts, dialect));
                ts.symbol(")");
            }
            Expr::Between { expr, low, high } => {
                expr.write(ts, dialect);
                ts.space().keyword("BETWEEN").space();
                low.write(ts, dialect);
                ts.space().keyword("AND").space();
                high.write(ts, dialect);
            }
            Expr::IsNull { expr, negated } => {
                expr.write(ts, dialect);
                ts.space()
                    .keyword(if *negated { "IS NOT NULL" } else { "IS NULL" });
            }
            Expr::Star => {
                ts.symbol("*");
            }
            Expr::CountStar => {
                ts.keyword("COUNT").symbol("(*)");
            }
            Expr::Paren(inner) => {
                ts.symbol("(");
                inner.write(ts, dialect);
                ts.symbol(")");
            }
            Expr::TimeLike(inner) => {
                inner.write(ts, dialect);
                if let Some(cast) = dialect.text_cast() {
                    ts.symbol(cast);
                }
            }
            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        self.write(&mut ts, dialect);
        ts.serialize(dialect)
    }
}
