//! INSERT, UPDATE and DELETE.
//!
//! Write statements address their table by name only and always carry
//! their values as parameters:
//!
//! ```
//! use jsonql::sql::{BinaryOperator, Dialect, Expr, Insert, TableRef, Update};
//!
//! let insert = Insert {
//!     table: TableRef::new("users"),
//!     columns: vec!["name".into(), "meta".into()],
//!     values: vec![Expr::Param(1), Expr::JsonParam(2)],
//! };
//! assert_eq!(
//!     insert.to_sql(Dialect::Postgres),
//!     "INSERT INTO \"users\" (\"name\", \"meta\") VALUES ($1, $2::json)"
//! );
//!
//! let update = Update {
//!     table: TableRef::new("users").with_schema("dbo"),
//!     set: vec![("status".into(), Expr::Param(1))],
//!     selection: Some(Expr::column("users", "id").binary(BinaryOperator::Eq, Expr::Param(2))),
//! };
//! assert_eq!(
//!     update.to_sql(Dialect::TSql),
//!     "UPDATE [dbo].[users] SET [status] = @p1 WHERE [users].[id] = @p2"
//! );
//! ```

use super::dialect::Dialect;
use super::expr::Expr;
use super::query::TableRef;
use super::token::TokenStream;

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableRef,
    pub set: Vec<(String, Expr)>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    pub selection: Option<Expr>,
}

impl Insert {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.keyword("INSERT INTO").space();
        self.table.write(&mut ts);
        ts.space().symbol("(");
        ts.comma_list(&self.columns, |ts, c| {
            ts.ident(c);
        });
        ts.symbol(")").space().keyword("VALUES").space().symbol("(");
        ts.comma_list(&self.values, |ts, v| v.write(ts, dialect));
        ts.symbol(")");
        ts.serialize(dialect)
    }
}

impl Update {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.keyword("UPDATE").space();
        self.table.write(&mut ts);
        ts.space().keyword("SET").space();
        ts.comma_list(&self.set, |ts, (column, value)| {
            ts.ident(column).space().symbol("=").space();
            value.write(ts, dialect);
        });
        write_selection(&mut ts, self.selection.as_ref(), dialect);
        ts.serialize(dialect)
    }
}

impl Delete {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.keyword("DELETE FROM").space();
        self.table.write(&mut ts);
        write_selection(&mut ts, self.selection.as_ref(), dialect);
        ts.serialize(dialect)
    }
}

fn write_selection(ts: &mut TokenStream, selection: Option<&Expr>, dialect: Dialect) {
    if let Some(selection) = selection {
        ts.space().keyword("WHERE").space();
        selection.write(ts, dialect);
    }
}
