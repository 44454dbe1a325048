//! SELECT statements.
//!
//! Rendered one clause per line:
//!
//! ```text
//! SELECT [DISTINCT]
//!   item, ...
//! FROM source, ...
//! <kind> JOIN table ON ...
//! WHERE ...
//! GROUP BY ...
//! ORDER BY expr ASC|DESC, ...
//! <dialect pagination>
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::expr::Expr;
use super::token::{Token, TokenStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    fn keyword(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// `[schema.]table [AS alias]`
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.to_string(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub(crate) fn write(&self, ts: &mut TokenStream) {
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            write_alias(ts, alias);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table(TableRef),
    /// `(SELECT ...) AS alias`
    Derived { query: Box<Query>, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<TableSource>,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<(Expr, SortDir)>,
    pub page: Option<Page>,
}

impl Query {
    pub fn write(&self, ts: &mut TokenStream, dialect: Dialect) {
        ts.keyword("SELECT");
        if self.distinct {
            ts.space().keyword("DISTINCT");
        }
        for (i, item) in self.projection.iter().enumerate() {
            if i > 0 {
                ts.symbol(",");
            }
            ts.newline().indent(1);
            item.expr.write(ts, dialect);
            if let Some(alias) = &item.alias {
                write_alias(ts, alias);
            }
        }

        if !self.from.is_empty() {
            ts.newline().keyword("FROM").space();
            ts.comma_list(&self.from, |ts, source| match source {
                TableSource::Table(table) => table.write(ts),
                TableSource::Derived { query, alias } => {
                    ts.symbol("(");
                    query.write(ts, dialect);
                    ts.symbol(")");
                    write_alias(ts, alias);
                }
            });
        }

        for join in &self.joins {
            ts.newline().keyword(match join.join_type {
                JoinType::Inner => "INNER JOIN",
                JoinType::Left => "LEFT JOIN",
                JoinType::Right => "RIGHT JOIN",
                JoinType::Full => "FULL OUTER JOIN",
            });
            ts.space();
            join.table.write(ts);
            if let Some(on) = &join.on {
                ts.space().keyword("ON").space();
                on.write(ts, dialect);
            }
        }

        if let Some(selection) = &self.selection {
            ts.newline().keyword("WHERE").space();
            selection.write(ts, dialect);
        }

        if !self.group_by.is_empty() {
            ts.newline().keyword("GROUP BY").space();
            ts.comma_list(&self.group_by, |ts, e| e.write(ts, dialect));
        }

        if !self.order_by.is_empty() {
            ts.newline().keyword("ORDER BY").space();
            ts.comma_list(&self.order_by, |ts, (e, dir)| {
                e.write(ts, dialect);
                ts.space().keyword(dir.keyword());
            });
        } else if self.page.is_some() && dialect.pagination_needs_order() {
            // Arbitrary but valid ordering.
            ts.newline().keyword("ORDER BY").space().symbol("(");
            ts.keyword("SELECT NULL").symbol(")");
        }

        if let Some(page) = self.page {
            ts.newline().append(dialect.pagination(page.limit, page.offset));
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        self.write(&mut ts, dialect);
        ts.serialize(dialect)
    }
}

fn write_alias(ts: &mut TokenStream, alias: &str) {
    ts.space().keyword("AS").space().ident(alias);
}
