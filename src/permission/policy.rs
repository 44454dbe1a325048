//! Static permission facts and the policy that enforces them.
//!
//! Facts come from the `[permissions]` section of the settings file:
//!
//! ```toml
//! [[permissions.tables]]
//! table = "orders"
//! action = "query"
//!
//! [[permissions.tables.conditions]]
//! connector = "and"
//! expression = "orders.tenant_id = 7"
//!
//! [[permissions.columns]]
//! table = "users"
//! column = "email"
//! action = "read"
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PermissionCheck, PermissionPolicy};
use crate::action::{
    Action, ColumnItem, Connector, FilterItem, FilterValue, Operation, Operator, TableItemId,
    TableKind,
};
use crate::error::{Error, Result};
use crate::metadata::SchemaProvider;

/// What a table permission allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    #[default]
    All,
    Query,
    Add,
    Update,
    Delete,
}

impl TableAction {
    /// Table action an operation needs, if it touches tables at all.
    pub fn required_by(operation: Operation) -> Option<Self> {
        match operation {
            op if op.is_query() => Some(TableAction::Query),
            Operation::Struct => Some(TableAction::Query),
            Operation::Insert => Some(TableAction::Add),
            Operation::Update => Some(TableAction::Update),
            Operation::Delete => Some(TableAction::Delete),
            _ => None,
        }
    }

    pub fn grants(self, required: TableAction) -> bool {
        self == TableAction::All || self == required
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableAction::All => "all",
            TableAction::Query => "query",
            TableAction::Add => "add",
            TableAction::Update => "update",
            TableAction::Delete => "delete",
        })
    }
}

/// What a column permission allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAction {
    #[default]
    All,
    Read,
    Write,
}

impl ColumnAction {
    pub fn grants(self, required: ColumnAction) -> bool {
        self == ColumnAction::All || self == required
    }
}

/// Equality restriction on a column: `table.column = value`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableCondition {
    /// Table the column belongs to; the permission's own table when absent.
    #[serde(default)]
    pub table: Option<String>,
    pub column: String,
    pub value: String,
}

/// Trusted SQL predicate added verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExpressionCondition {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Expression(ExpressionCondition),
    Table(TableCondition),
}

/// A condition and the connector joining it to the request's filters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectorCondition {
    #[serde(default)]
    pub connector: Connector,
    #[serde(flatten)]
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TablePermission {
    #[serde(default)]
    pub source: Option<String>,
    pub table: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: TableAction,
    #[serde(default)]
    pub conditions: Vec<ConnectorCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnPermission {
    #[serde(default)]
    pub source: Option<String>,
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub action: ColumnAction,
    #[serde(default)]
    pub conditions: Vec<ConnectorCondition>,
}

/// Every permission fact known to a [`StaticPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PermissionFacts {
    pub tables: Vec<TablePermission>,
    pub columns: Vec<ColumnPermission>,
}

fn source_matches(fact: &Option<String>, source: Option<&str>) -> bool {
    match fact {
        None => true,
        Some(fact) => source.is_some_and(|s| s.eq_ignore_ascii_case(fact)),
    }
}

static SUBQUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bselect\b").expect("subquery pattern"));

/// Enforces a fixed set of [`PermissionFacts`].
///
/// A table is usable only through a permission granting `all` or the
/// operation's action. Conditions of the granting permissions are ANDed (or
/// ORed) onto the request's filters. Tables with column permissions expose
/// only the columns those permissions allow, and no free-form expression may
/// be used while such a table is part of the request. Subquery expressions
/// are never allowed.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicy {
    facts: PermissionFacts,
}

impl StaticPolicy {
    pub fn new(facts: PermissionFacts) -> Self {
        Self { facts }
    }

    fn table_permissions<'s>(
        &'s self,
        source: Option<&'s str>,
        table: &'s str,
    ) -> impl Iterator<Item = &'s TablePermission> + 's {
        self.facts.tables.iter().filter(move |p| {
            p.table.eq_ignore_ascii_case(table) && source_matches(&p.source, source)
        })
    }

    fn column_permissions<'s>(
        &'s self,
        source: Option<&'s str>,
        table: &'s str,
    ) -> impl Iterator<Item = &'s ColumnPermission> + 's {
        self.facts.columns.iter().filter(move |p| {
            p.table.eq_ignore_ascii_case(table) && source_matches(&p.source, source)
        })
    }

    /// Filter item for one permission condition, bound to `item` unless the
    /// condition names another table of the request.
    fn condition_filter(
        &self,
        condition: &ConnectorCondition,
        action: &Action,
        item: TableItemId,
        schema: &dyn SchemaProvider,
    ) -> Result<Option<FilterItem>> {
        let connector = condition.connector;
        let table = match &condition.condition {
            Condition::Expression(e) => {
                return Ok(Some(FilterItem::Expression {
                    connector,
                    expression: e.expression.clone(),
                }))
            }
            Condition::Table(t) => t,
        };

        let item = match &table.table {
            None => item,
            Some(name) => match action
                .table_items()
                .iter()
                .position(|t| t.name.eq_ignore_ascii_case(name))
            {
                Some(i) => TableItemId(i),
                None => return Ok(None),
            },
        };
        let table_item = action.table_item(item);
        let table_id = table_item
            .table
            .ok_or_else(|| Error::TableNotFound(table_item.name.clone()))?;
        let column = schema
            .get_column(table_id, &table.column)
            .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", table_item.name, table.column)))?;

        let column = match table_item.kind {
            TableKind::Main => {
                ColumnItem::column(column.id, &column.name, column.column_type.clone(), item)
            }
            TableKind::Join => {
                ColumnItem::join_column(column.id, &column.name, column.column_type.clone(), item)
            }
        };
        Ok(Some(FilterItem::Condition {
            connector,
            column,
            operator: Operator::Equal,
            value: FilterValue::Single(table.value.clone()),
        }))
    }

    fn is_readable(&self, source: Option<&str>, table: &str, column: &str) -> bool {
        let mut rules = self.column_permissions(source, table).peekable();
        rules.peek().is_none()
            || rules.any(|p| {
                p.column.eq_ignore_ascii_case(column) && p.action.grants(ColumnAction::Read)
            })
    }

    /// Reason a free-form expression may not be used, if any.
    fn expression_violation(&self, action: &Action, expression: &str) -> Option<String> {
        if SUBQUERY.is_match(expression) {
            return Some(format!("subquery expression [{expression}] is not allowed"));
        }
        let source = action.source();
        let restricted = action
            .table_items()
            .iter()
            .find(|t| self.column_permissions(source, &t.name).next().is_some())?;
        Some(format!(
            "expression [{expression}] is not allowed on table [{}] with column permissions",
            restricted.name
        ))
    }

    /// Reason `column` may not be read, if any.
    fn column_violation(&self, action: &Action, column: &ColumnItem) -> Option<String> {
        let Some(item) = column.table_item() else {
            return self.expression_violation(action, &column.name);
        };
        let table = &action.table_item(item).name;
        (!self.is_readable(action.source(), table, &column.name))
            .then(|| format!("no read permission on column [{table}.{}]", column.name))
    }

    /// Strip projected columns no permission lets the request read.
    fn restrict_columns(&self, action: &mut Action) -> std::result::Result<(), String> {
        let source = action.source().map(str::to_string);
        let mut hidden = Vec::new();
        for column in action.column_items() {
            let Some(item) = column.table_item() else {
                if let Some(reason) = self.expression_violation(action, &column.name) {
                    return Err(reason);
                }
                continue;
            };
            let table = &action.table_item(item).name;
            if !self.is_readable(source.as_deref(), table, &column.name) {
                hidden.push(column.clone());
            }
        }
        if hidden.is_empty() {
            return Ok(());
        }

        debug!(hidden = hidden.len(), "Hiding unreadable columns");
        action.retain_column_items(|c| !hidden.contains(c));
        if action.column_items().is_empty() {
            return Err("no readable columns requested".to_string());
        }
        Ok(())
    }

    /// First filter, group or order column the request may not read.
    fn clause_violation(&self, action: &Action) -> Option<String> {
        fn filter_columns<'f>(items: &'f [FilterItem], out: &mut Vec<&'f ColumnItem>) {
            for item in items {
                match item {
                    FilterItem::Condition { column, .. } => out.push(column),
                    FilterItem::Group { items, .. } => filter_columns(items, out),
                    FilterItem::Expression { .. } => {}
                }
            }
        }

        let mut columns = Vec::new();
        filter_columns(action.filter_items(), &mut columns);
        columns.extend(action.group_items().iter().map(|g| &g.column));
        columns.extend(action.order_items().iter().map(|o| &o.column));
        columns
            .into_iter()
            .find_map(|column| self.column_violation(action, column))
    }

    /// First written column no permission lets the request write.
    fn unwritable_column(&self, action: &Action) -> Option<String> {
        let table = action.primary_table_item()?;
        let rules: Vec<&ColumnPermission> =
            self.column_permissions(action.source(), &table.name).collect();
        if rules.is_empty() {
            return None;
        }
        action
            .values()
            .iter()
            .find(|value| {
                !rules.iter().any(|p| {
                    p.column.eq_ignore_ascii_case(&value.name)
                        && p.action.grants(ColumnAction::Write)
                })
            })
            .map(|value| format!("{}.{}", table.name, value.name))
    }
}

impl PermissionPolicy for StaticPolicy {
    fn check(&self, mut action: Action, schema: &dyn SchemaProvider) -> Result<PermissionCheck> {
        let Some(required) = TableAction::required_by(action.operation()) else {
            return Ok(PermissionCheck::Pass(action));
        };

        let mut injected = Vec::new();
        for (i, item) in action.table_items().iter().enumerate() {
            // Joined tables are only ever read.
            let needed = match item.kind {
                TableKind::Main => required,
                TableKind::Join => TableAction::Query,
            };
            let granted: Vec<&TablePermission> = self
                .table_permissions(action.source(), &item.name)
                .filter(|p| p.action.grants(needed))
                .collect();
            if granted.is_empty() {
                return Ok(PermissionCheck::Deny(format!(
                    "no {needed} permission on table [{}]",
                    item.name
                )));
            }
            for condition in granted.iter().flat_map(|p| &p.conditions) {
                if let Some(filter) = self.condition_filter(condition, &action, TableItemId(i), schema)? {
                    injected.push(filter);
                }
            }
        }

        if action.is_query() {
            if let Err(reason) = self.restrict_columns(&mut action) {
                return Ok(PermissionCheck::Deny(reason));
            }
        }
        if matches!(action.operation(), Operation::Insert | Operation::Update) {
            if let Some(column) = self.unwritable_column(&action) {
                return Ok(PermissionCheck::Deny(format!(
                    "no write permission on column [{column}]"
                )));
            }
        }

        if let Some(reason) = self.clause_violation(&action) {
            return Ok(PermissionCheck::Deny(reason));
        }

        if !injected.is_empty() {
            debug!(conditions = injected.len(), "Injecting permission conditions");
            let existing = action.take_filter_items();
            if existing.len() > 1 {
                action.add_filter_item(FilterItem::Group {
                    connector: Connector::And,
                    items: existing,
                });
            } else {
                existing.into_iter().for_each(|f| action.add_filter_item(f));
            }
            injected.into_iter().for_each(|f| action.add_filter_item(f));
        }
        Ok(PermissionCheck::Pass(action))
    }
}
