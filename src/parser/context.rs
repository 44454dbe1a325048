//! Per-request parse state.
//!
//! The context owns the [`Action`] under construction together with the
//! lookups the parser needs while binding references: which tables are bound
//! under which key, and which tables the request asked to join. It lives for
//! one parse and is consumed into the finished action.

use crate::action::{Action, ColumnItem, TableItem, TableItemId, TableKind};
use crate::error::{Error, Result};
use crate::metadata::{ColumnId, SchemaProvider, TableId};
use crate::sql::SqlDialect;

use super::reference::{column_path, TableReference};
use super::ParseOptions;

pub(crate) struct ParseContext<'a> {
    schema: &'a dyn SchemaProvider,
    options: &'a ParseOptions,
    action: Action,
    requested_joins: Vec<TableId>,
}

impl<'a> ParseContext<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, options: &'a ParseOptions, action: Action) -> Self {
        Self {
            schema,
            options,
            action,
            requested_joins: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'a dyn SchemaProvider {
        self.schema
    }

    pub fn action_mut(&mut self) -> &mut Action {
        &mut self.action
    }

    pub fn into_action(self) -> Action {
        self.action
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// Bind a main table. Unknown tables fail on dialects that validate
    /// table existence and become expression-only items elsewhere.
    pub fn bind_main_table(&mut self, reference: &TableReference) -> Result<TableItemId> {
        let (table, name, display_name, schema) = match self.schema.get_table(&reference.table) {
            Some(t) => (
                Some(t.id),
                t.name.clone(),
                t.display_name.clone(),
                t.schema.clone(),
            ),
            None if self.action.dialect().validates_table_exists() => {
                return Err(Error::TableNotFound(reference.table.clone()));
            }
            None => (
                None,
                reference.table.clone(),
                reference.table.clone(),
                None,
            ),
        };

        // Write statements address the table by name only.
        let (alias, custom_alias) = if self.action.operation().is_write() {
            (None, false)
        } else if let Some(alias) = &reference.alias {
            (Some(alias.clone()), true)
        } else {
            (self.action.next_table_alias(&name), false)
        };

        Ok(self.action.add_table_item(TableItem {
            table,
            name,
            display_name,
            schema,
            alias,
            custom_alias,
            kind: TableKind::Main,
        }))
    }

    pub fn primary_table_item(&self) -> Option<TableItemId> {
        self.action.main_table_items().next().map(|(id, _)| id)
    }

    pub fn request_join(&mut self, table: TableId) {
        if !self.requested_joins.contains(&table) {
            self.requested_joins.push(table);
        }
    }

    /// Table item bound under `key` (alias, or name when unaliased).
    fn item_by_key(&self, key: &str) -> Option<TableItemId> {
        self.action
            .table_items()
            .iter()
            .position(|t| t.key().eq_ignore_ascii_case(key))
            .map(TableItemId)
    }

    /// First item bound to `table`: main items before join items.
    fn item_for_table(&self, table: TableId) -> Option<TableItemId> {
        self.action
            .table_items()
            .iter()
            .position(|t| t.table == Some(table))
            .map(TableItemId)
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Resolve a column reference to a schema column and the table item it
    /// is read through. `None` means the text is an expression.
    fn resolve_column(&self, expression: &str) -> Result<Option<(ColumnId, TableItemId)>> {
        let Some(parts) = column_path(expression) else {
            return Ok(None);
        };
        let not_found = || Error::ColumnNotFound(expression.to_string());

        match parts.as_slice() {
            [name] => Ok(self
                .action
                .table_items()
                .iter()
                .enumerate()
                .find_map(|(i, item)| {
                    let column = self.schema.get_column(item.table?, name)?;
                    Some((column.id, TableItemId(i)))
                })),
            [qualifier, name] => {
                if let Some(item) = self.item_by_key(qualifier) {
                    let Some(table) = self.action.table_item(item).table else {
                        return Ok(None);
                    };
                    let column = self.schema.get_column(table, name).ok_or_else(not_found)?;
                    return Ok(Some((column.id, item)));
                }
                match self.schema.get_table(qualifier) {
                    Some(table) => {
                        let column = self.schema.get_column(table.id, name).ok_or_else(not_found)?;
                        let item = self.item_for_table(table.id).ok_or_else(not_found)?;
                        Ok(Some((column.id, item)))
                    }
                    None => Ok(None),
                }
            }
            [schema_name, table, name] => match self.schema.get_table_in(schema_name, table) {
                Some(table) => {
                    let column = self.schema.get_column(table.id, name).ok_or_else(not_found)?;
                    let item = self.item_for_table(table.id).ok_or_else(not_found)?;
                    Ok(Some((column.id, item)))
                }
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn bound_column(&self, column: ColumnId, item: TableItemId, alias: Option<&str>) -> ColumnItem {
        let col = self.schema.column(column);
        let table_item = self.action.table_item(item);
        match table_item.kind {
            TableKind::Main => {
                let c = ColumnItem::column(column, &col.name, col.column_type.clone(), item);
                match alias {
                    Some(alias) => c.with_alias(alias, true),
                    None => c,
                }
            }
            TableKind::Join => {
                let c = ColumnItem::join_column(column, &col.name, col.column_type.clone(), item);
                match alias {
                    Some(alias) => c.with_alias(alias, true),
                    None => {
                        let generated = format!(
                            "{}{}{}",
                            table_item.key(),
                            self.options.association_connector,
                            col.name
                        );
                        c.with_alias(generated, false)
                    }
                }
            }
        }
    }

    /// Build a column item for a `fields` entry.
    pub fn create_column_item(&self, expression: &str, alias: Option<&str>) -> Result<ColumnItem> {
        match self.resolve_column(expression)? {
            Some((column, item)) => Ok(self.bound_column(column, item, alias)),
            None => {
                let item = ColumnItem::expression(expression)?;
                Ok(match alias {
                    Some(alias) => item.with_alias(alias, true),
                    None => item,
                })
            }
        }
    }

    /// Reuse a projected column matching `expression` by alias or by the
    /// schema column it resolves to, else build a new one. Used by where,
    /// group and order.
    pub fn find_column_item(&self, expression: &str) -> Result<ColumnItem> {
        let resolved = self.resolve_column(expression)?;
        let existing = self.action.column_items().iter().find(|c| {
            c.alias.as_deref() == Some(expression)
                || (resolved.is_some() && c.schema_column().zip(c.table_item()) == resolved)
        });
        match existing {
            Some(c) => Ok(c.clone()),
            None => self.create_column_item(expression, None),
        }
    }

    /// Project every column of the main tables, then of the requested join tables.
    pub fn add_all_columns(&mut self) {
        let main: Vec<TableItemId> = self.action.main_table_items().map(|(id, _)| id).collect();
        let joined: Vec<TableItemId> = self
            .action
            .table_items()
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.kind == TableKind::Join
                    && t.table.is_some_and(|id| self.requested_joins.contains(&id))
            })
            .map(|(i, _)| TableItemId(i))
            .collect();

        for item in main.into_iter().chain(joined) {
            self.add_item_columns(item);
        }
    }

    /// Project every column of the table bound under `key` (`t.*`).
    pub fn add_table_columns(&mut self, key: &str) -> Result<()> {
        let key = key.rsplit('.').next().unwrap_or(key);
        let item = self
            .item_by_key(key)
            .or_else(|| {
                self.schema
                    .get_table(key)
                    .and_then(|t| self.item_for_table(t.id))
            })
            .ok_or_else(|| Error::TableNotFound(key.to_string()))?;
        self.add_item_columns(item);
        Ok(())
    }

    fn add_item_columns(&mut self, item: TableItemId) {
        let Some(table) = self.action.table_item(item).table else {
            if let Ok(star) = ColumnItem::expression("*") {
                self.action.add_column_item(star);
            }
            return;
        };
        let columns: Vec<ColumnItem> = self
            .schema
            .columns_of(table)
            .into_iter()
            .map(|c| self.bound_column(c.id, item, None))
            .collect();
        for column in columns {
            self.action.add_column_item(column);
        }
    }

    /// Schema column of the primary table a write value targets.
    pub fn value_column(&self, name: &str) -> Option<ColumnId> {
        let primary = self.primary_table_item()?;
        let table = self.action.table_item(primary).table?;
        let name = name.rsplit('.').next().unwrap_or(name);
        self.schema.get_column(table, name).map(|c| c.id)
    }
}
