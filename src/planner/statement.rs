//! Statement builder: renders an [`Action`] into SQL text and parameters.
//!
//! The builder lowers action items onto the [`sql`](crate::sql) AST and
//! lets the dialect serialize it. Request values never reach the SQL text;
//! every value becomes a positional parameter.

use crate::action::{
    Action, ColumnItem, ColumnTarget, Connector, FilterItem, FilterValue, JoinItem, JoinKind,
    Operation, Operator, Statement, TableItem, Value,
};
use crate::error::{Error, Result};
use crate::sql::{
    BinaryOperator, Delete, Dialect, Expr, Insert, Join, JoinType, Page, Query, SelectItem,
    SqlDialect, TableRef, TableSource, Update,
};

/// Alias of the derived table wrapped by grouped or distinct count statements.
const COUNT_ALIAS: &str = "count_result";

/// Renders actions for one dialect.
pub struct StatementBuilder {
    dialect: Dialect,
    params: Vec<Value>,
}

impl StatementBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Render the statement for a CRUD action.
    pub fn build(mut self, action: &Action) -> Result<Statement> {
        let sql = match action.operation() {
            op if op.is_query() => self.select(action)?.to_sql(self.dialect),
            Operation::Insert => self.insert(action)?.to_sql(self.dialect),
            Operation::Update => self.update(action)?.to_sql(self.dialect),
            Operation::Delete => self.delete(action)?.to_sql(self.dialect),
            op => {
                return Err(Error::malformed(format!(
                    "{op} operation does not render a statement"
                )))
            }
        };
        Ok(Statement {
            sql,
            params: self.params,
        })
    }

    /// Render `SELECT COUNT(*)` over the action's tables, joins and filters.
    ///
    /// Grouped or distinct queries are counted through a derived table so the
    /// count matches the number of result rows.
    pub fn build_count(mut self, action: &Action) -> Result<Statement> {
        let base = self.base_query(action)?;

        let count = if action.group_items().is_empty() && !action.is_distinct() {
            Query {
                projection: vec![Expr::CountStar.into()],
                ..base
            }
        } else {
            let inner = Query {
                distinct: action.is_distinct(),
                projection: self.projection(action),
                group_by: self.group_by(action),
                ..base
            };
            Query {
                projection: vec![Expr::CountStar.into()],
                from: vec![TableSource::Derived {
                    query: Box::new(inner),
                    alias: COUNT_ALIAS.to_string(),
                }],
                ..Query::default()
            }
        };

        Ok(Statement {
            sql: count.to_sql(self.dialect),
            params: self.params,
        })
    }

    // ------------------------------------------------------------------
    // SELECT
    // ------------------------------------------------------------------

    fn select(&mut self, action: &Action) -> Result<Query> {
        let base = self.base_query(action)?;
        let order_by = action
            .order_items()
            .iter()
            .map(|o| (self.column_expr(action, &o.column), o.dir))
            .collect();
        Ok(Query {
            distinct: action.is_distinct(),
            projection: self.projection(action),
            group_by: self.group_by(action),
            order_by,
            page: action.limit().map(|l| Page {
                limit: l.limit(),
                offset: l.offset(),
            }),
            ..base
        })
    }

    /// FROM, JOIN and WHERE shared by the select and count statements.
    fn base_query(&mut self, action: &Action) -> Result<Query> {
        let from: Vec<TableSource> = action
            .main_table_items()
            .map(|(_, item)| TableSource::Table(table_ref(item)))
            .collect();
        if from.is_empty() {
            return Err(Error::malformed("table node value is null"));
        }
        let joins = action
            .join_items()
            .iter()
            .map(|join| self.join(action, join))
            .collect::<Result<Vec<_>>>()?;

        Ok(Query {
            from,
            joins,
            selection: self.filters(action, action.filter_items())?,
            ..Query::default()
        })
    }

    fn projection(&self, action: &Action) -> Vec<SelectItem> {
        if action.column_items().is_empty() {
            return vec![Expr::Star.into()];
        }
        action
            .column_items()
            .iter()
            .map(|c| SelectItem {
                expr: self.column_expr(action, c),
                alias: c.alias.clone(),
            })
            .collect()
    }

    fn group_by(&self, action: &Action) -> Vec<Expr> {
        action
            .group_items()
            .iter()
            .map(|g| self.column_expr(action, &g.column))
            .collect()
    }

    fn join(&self, action: &Action, join: &JoinItem) -> Result<Join> {
        let right = join
            .right_table_item()
            .ok_or_else(|| Error::malformed("join has no table"))?;

        let on = join
            .conditions
            .iter()
            .map(|c| {
                self.column_expr(action, &c.left)
                    .binary(BinaryOperator::Eq, self.column_expr(action, &c.right))
            })
            .reduce(Expr::and);

        let join_type = match join.kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::Left,
            JoinKind::Right => JoinType::Right,
            JoinKind::Full if !self.dialect.supports_full_outer_join() => {
                return Err(Error::UnsupportedJoinType("full".to_string()));
            }
            JoinKind::Full => JoinType::Full,
        };
        Ok(Join {
            join_type,
            table: table_ref(action.table_item(right)),
            on,
        })
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    fn insert(&mut self, action: &Action) -> Result<Insert> {
        let table = write_table(action)?;
        if action.values().is_empty() {
            return Err(Error::malformed("values node must be an object"));
        }
        let values = action
            .values()
            .iter()
            .map(|v| self.bind(v.value.clone(), v.column_type.is_json()))
            .collect();
        Ok(Insert {
            table,
            columns: action.values().iter().map(|v| v.name.clone()).collect(),
            values,
        })
    }

    fn update(&mut self, action: &Action) -> Result<Update> {
        let table = write_table(action)?;
        if action.values().is_empty() {
            return Err(Error::malformed("values node must be an object"));
        }
        // SET parameters come before WHERE parameters.
        let set = action
            .values()
            .iter()
            .map(|v| (v.name.clone(), self.bind(v.value.clone(), v.column_type.is_json())))
            .collect();
        Ok(Update {
            table,
            set,
            selection: self.filters(action, action.filter_items())?,
        })
    }

    fn delete(&mut self, action: &Action) -> Result<Delete> {
        Ok(Delete {
            table: write_table(action)?,
            selection: self.filters(action, action.filter_items())?,
        })
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    /// Fold sibling filters left to right with their connectors.
    fn filters(&mut self, action: &Action, items: &[FilterItem]) -> Result<Option<Expr>> {
        let mut acc: Option<Expr> = None;
        for item in items {
            let Some(expr) = self.filter(action, item)? else {
                continue;
            };
            acc = Some(match acc {
                None => expr,
                Some(prev) => match item.connector() {
                    // AND binds tighter than OR: keep the left-to-right reading.
                    Connector::And if prev.is_or() => prev.paren().and(expr),
                    Connector::And => prev.and(expr),
                    Connector::Or => prev.or(expr),
                },
            });
        }
        Ok(acc)
    }

    fn filter(&mut self, action: &Action, item: &FilterItem) -> Result<Option<Expr>> {
        match item {
            FilterItem::Group { items, .. } => {
                Ok(self.filters(action, items)?.map(Expr::paren))
            }
            FilterItem::Expression { expression, .. } => Ok(Some(Expr::raw(expression).paren())),
            FilterItem::Condition {
                column,
                operator,
                value,
                ..
            } => self.condition(action, column, *operator, value).map(Some),
        }
    }

    fn condition(
        &mut self,
        action: &Action,
        column: &ColumnItem,
        operator: Operator,
        value: &FilterValue,
    ) -> Result<Expr> {
        let col = self.column_expr(action, column);
        let json = column.column_type.is_json();
        let values: Vec<&str> = match value {
            FilterValue::None => vec![],
            FilterValue::Single(v) => vec![v.as_str()],
            FilterValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        };
        if let Some(arity) = operator.arity() {
            if values.len() != arity {
                return Err(Error::InvalidFilter(format!(
                    "{}{}{}",
                    column.name,
                    operator.symbol(),
                    values.join(",")
                )));
            }
        }

        let expr = match operator {
            Operator::Null => col.null_check(false),
            Operator::NotNull => col.null_check(true),
            Operator::Like | Operator::NotLike => {
                let target = if column.column_type.is_time_like() {
                    Expr::TimeLike(Box::new(col))
                } else {
                    col
                };
                // LIKE patterns are passed through untouched.
                let pattern = self.bind(Value::Text(values[0].to_string()), false);
                let like = target.binary(BinaryOperator::Like, pattern);
                if operator == Operator::NotLike {
                    like.paren().negate()
                } else {
                    like
                }
            }
            Operator::In | Operator::NotIn => {
                let params = values
                    .iter()
                    .map(|v| self.bind_coerced(v, column, json))
                    .collect();
                col.in_list(params, operator == Operator::NotIn)
            }
            Operator::Between => {
                let low = self.bind_coerced(values[0], column, json);
                let high = self.bind_coerced(values[1], column, json);
                col.between(low, high)
            }
            Operator::Equal
            | Operator::StrongEqual
            | Operator::NotEqual
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte => {
                let op = match operator {
                    Operator::NotEqual => BinaryOperator::Ne,
                    Operator::Gt => BinaryOperator::Gt,
                    Operator::Gte => BinaryOperator::Gte,
                    Operator::Lt => BinaryOperator::Lt,
                    Operator::Lte => BinaryOperator::Lte,
                    _ => BinaryOperator::Eq,
                };
                let param = self.bind_coerced(values[0], column, json);
                col.binary(op, param)
            }
        };
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn column_expr(&self, action: &Action, column: &ColumnItem) -> Expr {
        match &column.target {
            ColumnTarget::Column { table_item, .. } | ColumnTarget::JoinColumn { table_item, .. } => {
                Expr::column(action.table_item(*table_item).key(), &column.name)
            }
            ColumnTarget::Expression(expression) => Expr::raw(expression),
        }
    }

    fn bind_coerced(&mut self, raw: &str, column: &ColumnItem, json: bool) -> Expr {
        self.bind(Value::coerce(raw, &column.column_type), json)
    }

    fn bind(&mut self, value: Value, json: bool) -> Expr {
        self.params.push(value);
        let index = self.params.len();
        if json {
            Expr::JsonParam(index)
        } else {
            Expr::Param(index)
        }
    }
}

fn table_ref(item: &TableItem) -> TableRef {
    let mut table = TableRef::new(&item.name);
    if let Some(schema) = &item.schema {
        table = table.with_schema(schema);
    }
    match &item.alias {
        Some(alias) if alias != &item.name => table.with_alias(alias),
        _ => table,
    }
}

/// The primary table, addressed without alias.
fn write_table(action: &Action) -> Result<TableRef> {
    let item = action
        .primary_table_item()
        .ok_or_else(|| Error::malformed("table node value is null"))?;
    Ok(TableRef {
        alias: None,
        ..table_ref(item)
    })
}
