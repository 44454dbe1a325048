//! JSON request parser.
//!
//! A request is a JSON object with exactly one operation key. The value of
//! that key names the table(s); companion keys refine the statement:
//!
//! ```json
//! {
//!   "select": "source.orders o",
//!   "join": ["customers", {"inner": "regions"}],
//!   "fields": ["o.id", "customers.name as customer", "count(*) total"],
//!   "where": ["o.total>=100", {"or": ["status=open,pending", "regions.code=EU"]}],
//!   "group": "customers.name",
//!   "order": "-o.created_at",
//!   "limit": [0, 20]
//! }
//! ```
//!
//! Parsing binds references against a [`SchemaProvider`] and produces an
//! [`Action`]. Joins are resolved by the [`JoinBuilder`] as soon as the
//! `join` node is read, so later nodes can refer to joined tables.

mod context;
mod filter;
mod order;
mod reference;

pub use filter::{parse_condition, Condition};
pub use order::parse_order;
pub use reference::{column_path, is_identifier, ColumnReference, TableReference};

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::action::{
    Action, Connector, FilterItem, GroupItem, JoinKind, LimitItem, Operation, OrderItem, Value,
    ValueItem,
};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::metadata::SchemaProvider;
use crate::planner::{JoinBuilder, JoinRequest};
use crate::sql::Dialect;

use context::ParseContext;

/// Request keys besides the operation key.
pub mod keys {
    pub const FIELDS: &str = "fields";
    pub const JOIN: &str = "join";
    pub const WHERE: &str = "where";
    pub const GROUP: &str = "group";
    pub const ORDER: &str = "order";
    pub const LIMIT: &str = "limit";
    pub const VALUES: &str = "values";
    pub const FILE: &str = "file";
    pub const TEMPLATE: &str = "template";
}

/// Parser knobs taken from the settings.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Separator of generated join-column aliases.
    pub association_connector: String,
    pub join_on_multi_column: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            association_connector: "__".to_string(),
            join_on_multi_column: false,
        }
    }
}

impl ParseOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            association_connector: settings.association_connector.clone(),
            join_on_multi_column: settings.join_on_multi_column,
        }
    }
}

/// Find the single operation key of a request.
pub fn detect_operation(request: &Map<String, Json>) -> Result<(Operation, &str)> {
    let mut found = request
        .keys()
        .filter_map(|key| Operation::from_key(key).map(|op| (op, key.as_str())));
    let first = found.next().ok_or(Error::NoOperation)?;
    if found.next().is_some() {
        return Err(Error::MultipleOperations);
    }
    Ok(first)
}

/// Data source a request names, if any.
///
/// For a transaction every sub-request must resolve to the same source,
/// with `default` standing in for sub-requests that name none.
pub fn request_source(request: &Json, default: Option<&str>) -> Result<Option<String>> {
    let request = as_object(request)?;
    let (operation, key) = detect_operation(request)?;
    let value = request.get(key).unwrap_or(&Json::Null);

    match operation {
        Operation::Transaction => {
            let children = value
                .as_array()
                .ok_or_else(|| Error::malformed("transaction node must be an array"))?;
            let mut sources = Vec::new();
            for child in children {
                let source = request_source(child, default)?.or(default.map(str::to_string));
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
            match sources.as_slice() {
                [source] => Ok(source.clone()),
                _ => Err(Error::CrossSourceTransaction),
            }
        }
        Operation::Structs => Ok(value.as_str().map(str::to_string)),
        Operation::Sql | Operation::Native => Ok(None),
        _ => match value {
            Json::String(s) => Ok(TableReference::parse(s)?.source),
            Json::Array(items) => match items.first().and_then(Json::as_str) {
                Some(s) => Ok(TableReference::parse(s)?.source),
                None => Ok(None),
            },
            _ => Ok(None),
        },
    }
}

fn as_object(request: &Json) -> Result<&Map<String, Json>> {
    request
        .as_object()
        .ok_or_else(|| Error::malformed("request must be a JSON object"))
}

/// A present attribute; present-but-null is an error.
fn attribute<'v>(request: &'v Map<String, Json>, name: &str) -> Result<Option<&'v Json>> {
    match request.get(name) {
        None => Ok(None),
        Some(Json::Null) => Err(Error::null_node(name)),
        Some(value) => Ok(Some(value)),
    }
}

fn as_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strings of a `string | [string]` node.
fn string_list<'v>(value: &'v Json, node: &str) -> Result<Vec<&'v str>> {
    let element = |v: &'v Json| {
        v.as_str()
            .map(str::trim)
            .ok_or_else(|| Error::malformed(format!("{node} node elements must be strings")))
    };
    match value {
        Json::Object(_) => Err(Error::malformed(format!("{node} node cannot be an object"))),
        Json::Array(items) => items.iter().map(element).collect(),
        other => Ok(vec![element(other)?]),
    }
}

/// Turns requests into actions against one schema.
pub struct Parser<'a> {
    schema: &'a dyn SchemaProvider,
    dialect: Dialect,
    options: ParseOptions,
}

impl<'a> Parser<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, dialect: Dialect) -> Self {
        Self {
            schema,
            dialect,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse_str(&self, json: &str) -> Result<Action> {
        let request: Json = serde_json::from_str(json)?;
        self.parse(&request)
    }

    pub fn parse(&self, request: &Json) -> Result<Action> {
        let object = as_object(request)?;
        let (operation, key) = detect_operation(object)?;
        let value = attribute(object, key)?.ok_or_else(|| Error::null_node(key))?;
        debug!(operation = %operation, "Parsing request");

        let mut action = match operation {
            Operation::Sql => {
                let sql = value
                    .as_str()
                    .ok_or_else(|| Error::malformed("sql node must be a string"))?;
                let mut action = Action::new(operation, self.dialect);
                action.set_native_sql(sql.to_string());
                action
            }
            Operation::Native => {
                let mut action = Action::new(operation, self.dialect);
                action.set_native_content(as_text(value));
                action
            }
            Operation::Transaction => self.parse_transaction(value)?,
            Operation::Structs => Action::new(operation, self.dialect),
            Operation::Struct => self.parse_struct(value)?,
            _ => self.parse_crud(operation, object, value)?,
        };

        // Transaction children carry their own sources.
        if operation != Operation::Transaction {
            action.set_source(request_source(request, None)?);
        }
        Ok(action)
    }

    fn parse_transaction(&self, value: &Json) -> Result<Action> {
        let children = value
            .as_array()
            .ok_or_else(|| Error::malformed("transaction node must be an array"))?;
        let mut action = Action::new(Operation::Transaction, self.dialect);
        for child in children {
            let child = self.parse(child)?;
            if child.operation() == Operation::Transaction {
                return Err(Error::malformed("transactions cannot be nested"));
            }
            action.add_transaction_action(child);
        }
        Ok(action)
    }

    fn parse_struct(&self, value: &Json) -> Result<Action> {
        let reference = TableReference::parse(
            value
                .as_str()
                .ok_or_else(|| Error::malformed("struct node must be a string"))?,
        )?;
        if self.schema.get_table(&reference.table).is_none() {
            return Err(Error::TableNotFound(reference.table));
        }
        let mut ctx = ParseContext::new(
            self.schema,
            &self.options,
            Action::new(Operation::Struct, self.dialect),
        );
        ctx.bind_main_table(&reference)?;
        Ok(ctx.into_action())
    }

    fn parse_crud(
        &self,
        operation: Operation,
        request: &Map<String, Json>,
        tables: &Json,
    ) -> Result<Action> {
        let mut ctx = ParseContext::new(
            self.schema,
            &self.options,
            Action::new(operation, self.dialect),
        );
        self.parse_tables(&mut ctx, tables)?;

        match operation {
            Operation::Insert => {
                self.parse_values(&mut ctx, request)?;
            }
            Operation::Update => {
                self.parse_values(&mut ctx, request)?;
                self.parse_where(&mut ctx, request)?;
            }
            Operation::Delete => {
                self.parse_where(&mut ctx, request)?;
            }
            _ => {
                self.parse_joins(&mut ctx, request)?;
                self.parse_fields(&mut ctx, request)?;
                self.parse_where(&mut ctx, request)?;
                self.parse_group(&mut ctx, request)?;
                self.parse_order(&mut ctx, request)?;
                self.parse_limit(&mut ctx, request)?;
            }
        }

        if let Some(file) = attribute(request, keys::FILE)? {
            ctx.action_mut().set_file(as_text(file));
        }
        if let Some(template) = attribute(request, keys::TEMPLATE)? {
            ctx.action_mut().set_template(as_text(template));
        }
        Ok(ctx.into_action())
    }

    fn parse_tables(&self, ctx: &mut ParseContext<'_>, tables: &Json) -> Result<()> {
        let references = match tables {
            Json::Object(_) => return Err(Error::malformed("table node cannot be an object")),
            other => string_list(other, "table")?,
        };
        if references.is_empty() {
            return Err(Error::null_node("table"));
        }
        for reference in references {
            ctx.bind_main_table(&TableReference::parse(reference)?)?;
        }
        Ok(())
    }

    fn parse_joins(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(joins) = attribute(request, keys::JOIN)? else {
            return Ok(());
        };
        let elements: Vec<&Json> = match joins {
            Json::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut requests = Vec::with_capacity(elements.len());
        for element in elements {
            let (name, kind) = match element {
                Json::Array(_) => return Err(Error::malformed("Join child node cannot be an array")),
                Json::Object(map) => {
                    let (kind, table) = map
                        .iter()
                        .next()
                        .ok_or_else(|| Error::null_node(keys::JOIN))?;
                    let table = table
                        .as_str()
                        .ok_or_else(|| Error::malformed("join table must be a string"))?;
                    (table, JoinKind::from_str(kind)?)
                }
                Json::String(table) => (table.as_str(), JoinKind::Left),
                _ => return Err(Error::malformed("join table must be a string")),
            };
            let reference = TableReference::parse(name)?;
            let table = self
                .schema
                .get_table(&reference.table)
                .ok_or_else(|| Error::TableNotFound(reference.table.clone()))?;
            ctx.request_join(table.id);
            requests.push(JoinRequest::new(table.id, kind));
        }

        let primary = ctx
            .primary_table_item()
            .ok_or_else(|| Error::null_node("table"))?;
        JoinBuilder::new(ctx.schema())
            .join_on_multi_column(self.options.join_on_multi_column)
            .build(ctx.action_mut(), primary, &requests)
    }

    fn parse_fields(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(fields) = attribute(request, keys::FIELDS)? else {
            ctx.add_all_columns();
            return Ok(());
        };
        let fields = string_list(fields, keys::FIELDS)?;
        if fields.is_empty() {
            ctx.add_all_columns();
            return Ok(());
        }

        for field in fields {
            if field == "*" {
                ctx.add_all_columns();
            } else if let Some(table) = field.strip_suffix(".*") {
                ctx.add_table_columns(table)?;
            } else {
                let reference = ColumnReference::parse(field);
                let item =
                    ctx.create_column_item(&reference.expression, reference.alias.as_deref())?;
                ctx.action_mut().add_column_item(item);
            }
        }
        Ok(())
    }

    fn parse_where(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(node) = attribute(request, keys::WHERE)? else {
            return Ok(());
        };
        match node {
            Json::Array(items) => {
                for item in items {
                    let filter = self.parse_filter(ctx, item)?;
                    ctx.action_mut().add_filter_item(filter);
                }
            }
            other => {
                let filter = self.parse_filter(ctx, other)?;
                ctx.action_mut().add_filter_item(filter);
            }
        }
        Ok(())
    }

    /// One filter node: a condition string, an array (implicit AND group) or
    /// a `{connector: node}` object.
    fn parse_filter(&self, ctx: &ParseContext<'_>, node: &Json) -> Result<FilterItem> {
        match node {
            Json::String(condition) => {
                let cond = parse_condition(condition)?;
                Ok(FilterItem::Condition {
                    connector: Connector::And,
                    column: ctx.find_column_item(&cond.column)?,
                    operator: cond.operator,
                    value: cond.value,
                })
            }
            Json::Array(items) => Ok(FilterItem::Group {
                connector: Connector::And,
                items: items
                    .iter()
                    .map(|item| self.parse_filter(ctx, item))
                    .collect::<Result<_>>()?,
            }),
            Json::Object(map) => {
                let (connector, inner) = map
                    .iter()
                    .next()
                    .ok_or_else(|| Error::malformed("where node format error"))?;
                let connector = Connector::from_str(connector)?;
                let filter = match inner {
                    Json::Array(_) | Json::String(_) => self.parse_filter(ctx, inner)?,
                    _ => return Err(Error::malformed("where node format error")),
                };
                Ok(filter.with_connector(connector))
            }
            other => Err(Error::InvalidFilter(other.to_string())),
        }
    }

    fn parse_group(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(node) = attribute(request, keys::GROUP)? else {
            return Ok(());
        };
        for group in string_list(node, keys::GROUP)? {
            let column = ctx.find_column_item(group)?;
            ctx.action_mut().add_group_item(GroupItem { column });
        }
        Ok(())
    }

    fn parse_order(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(node) = attribute(request, keys::ORDER)? else {
            return Ok(());
        };
        for order in string_list(node, keys::ORDER)? {
            let (column, dir) = parse_order(order)?;
            let column = ctx.find_column_item(&column)?;
            ctx.action_mut().add_order_item(OrderItem { column, dir });
        }
        Ok(())
    }

    fn parse_limit(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(node) = attribute(request, keys::LIMIT)? else {
            return Ok(());
        };
        let bounds: Option<Vec<u64>> = node
            .as_array()
            .filter(|items| items.len() == 2)
            .and_then(|items| items.iter().map(Json::as_u64).collect());
        match bounds.as_deref() {
            Some([start, end]) => {
                ctx.action_mut().set_limit(LimitItem::new(*start, *end));
                Ok(())
            }
            _ => Err(Error::malformed("limit node must be an array")),
        }
    }

    /// Write values. Names that match no column of the primary table are
    /// skipped.
    fn parse_values(&self, ctx: &mut ParseContext<'_>, request: &Map<String, Json>) -> Result<()> {
        let Some(node) = attribute(request, keys::VALUES)? else {
            return Ok(());
        };
        let values = node
            .as_object()
            .ok_or_else(|| Error::malformed("values node must be an object"))?;

        for (name, value) in values {
            let Some(column) = ctx.value_column(name) else {
                debug!(column = %name, "Skipping value for unknown column");
                continue;
            };
            let column = ctx.schema().column(column);
            let value = match value {
                Json::String(s) if column.column_type.is_json() => Value::Json(s.clone()),
                other => Value::from_json(other),
            };
            let item = ValueItem {
                column: column.id,
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                value,
            };
            ctx.action_mut().add_value_item(item);
        }
        Ok(())
    }
}
