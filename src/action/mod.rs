//! The query model built from one request.
//!
//! An [`Action`] is assembled by the [parser](crate::parser), optionally
//! rewritten by a [permission policy](crate::permission), rendered once into
//! a [`Statement`] and handed to a [data context](crate::context).
//!
//! ```text
//! Action
//!  ├── table_items   arena, main tables first, join-bound tables after
//!  ├── column_items  projection, deduplicated structurally
//!  ├── join_items    in relationship-path order
//!  ├── filter_items  FilterItem tree
//!  ├── group / order / limit
//!  ├── values        insert / update assignments
//!  └── statement     rendered lazily by build()
//! ```

mod item;

pub use item::{
    ColumnItem, ColumnTarget, Connector, FilterItem, FilterValue, GroupItem, JoinItem, JoinKind,
    LimitItem, Operator, OrderItem, SingleColumnJoin, TableItem, TableItemId, TableKind, Value,
    ValueItem,
};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::metadata::RelationshipPath;
use crate::planner::StatementBuilder;
use crate::sql::Dialect;

/// Request operation, named by the single operation key of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    SelectDistinct,
    Query,
    Detail,
    Insert,
    Update,
    Delete,
    Sql,
    Native,
    Transaction,
    Struct,
    Structs,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Select,
        Operation::SelectDistinct,
        Operation::Query,
        Operation::Detail,
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
        Operation::Sql,
        Operation::Native,
        Operation::Transaction,
        Operation::Struct,
        Operation::Structs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::SelectDistinct => "select_distinct",
            Operation::Query => "query",
            Operation::Detail => "detail",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Sql => "sql",
            Operation::Native => "native",
            Operation::Transaction => "transaction",
            Operation::Struct => "struct",
            Operation::Structs => "structs",
        }
    }

    /// Match a request key, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(key))
    }

    pub fn is_query(self) -> bool {
        matches!(
            self,
            Operation::Select | Operation::SelectDistinct | Operation::Query | Operation::Detail
        )
    }

    pub fn is_write(self) -> bool {
        matches!(self, Operation::Insert | Operation::Update | Operation::Delete)
    }

    pub fn is_crud(self) -> bool {
        self.is_query() || self.is_write()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rendered statement text and its ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// The aggregate root of one request.
#[derive(Debug, Clone)]
pub struct Action {
    operation: Operation,
    dialect: Dialect,
    source: Option<String>,
    table_items: Vec<TableItem>,
    column_items: Vec<ColumnItem>,
    join_items: Vec<JoinItem>,
    filter_items: Vec<FilterItem>,
    group_items: Vec<GroupItem>,
    order_items: Vec<OrderItem>,
    limit: Option<LimitItem>,
    values: Vec<ValueItem>,
    relationship_paths: Vec<RelationshipPath>,
    distinct: bool,
    file: Option<String>,
    template: Option<String>,
    native_sql: Option<String>,
    native_content: Option<String>,
    transaction: Vec<Action>,
    statement: Option<Statement>,
}

impl Action {
    pub fn new(operation: Operation, dialect: Dialect) -> Self {
        Self {
            operation,
            dialect,
            source: None,
            table_items: Vec::new(),
            column_items: Vec::new(),
            join_items: Vec::new(),
            filter_items: Vec::new(),
            group_items: Vec::new(),
            order_items: Vec::new(),
            limit: None,
            values: Vec::new(),
            relationship_paths: Vec::new(),
            distinct: operation == Operation::SelectDistinct,
            file: None,
            template: None,
            native_sql: None,
            native_content: None,
            transaction: Vec::new(),
            statement: None,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    pub fn is_detail(&self) -> bool {
        self.operation == Operation::Detail
    }

    pub fn is_query(&self) -> bool {
        self.operation.is_query()
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    pub fn add_table_item(&mut self, item: TableItem) -> TableItemId {
        self.table_items.push(item);
        TableItemId(self.table_items.len() - 1)
    }

    pub fn table_item(&self, id: TableItemId) -> &TableItem {
        &self.table_items[id.0]
    }

    pub fn table_items(&self) -> &[TableItem] {
        &self.table_items
    }

    /// Main tables with their ids, in request order.
    pub fn main_table_items(&self) -> impl Iterator<Item = (TableItemId, &TableItem)> {
        self.table_items
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TableKind::Main)
            .map(|(i, t)| (TableItemId(i), t))
    }

    pub fn primary_table_item(&self) -> Option<&TableItem> {
        self.main_table_items().next().map(|(_, t)| t)
    }

    /// Whether a table key (alias or name) is already taken.
    pub fn has_table_key(&self, key: &str) -> bool {
        self.table_items
            .iter()
            .any(|t| t.key().eq_ignore_ascii_case(key))
    }

    /// Alias for a new item of table `name`: none while the name is free as
    /// a key, else the first free `{name}{n}`.
    pub fn next_table_alias(&self, name: &str) -> Option<String> {
        if !self.has_table_key(name) {
            return None;
        }
        (1..)
            .map(|n| format!("{name}{n}"))
            .find(|alias| !self.has_table_key(alias))
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Add a column; structural duplicates are ignored.
    pub fn add_column_item(&mut self, item: ColumnItem) {
        if !self.column_items.contains(&item) {
            self.column_items.push(item);
        }
    }

    pub fn column_items(&self) -> &[ColumnItem] {
        &self.column_items
    }

    pub fn retain_column_items(&mut self, f: impl FnMut(&ColumnItem) -> bool) {
        self.column_items.retain(f);
    }

    // ------------------------------------------------------------------
    // Joins
    // ------------------------------------------------------------------

    pub fn add_join_item(&mut self, item: JoinItem) {
        self.join_items.push(item);
    }

    pub fn join_items(&self) -> &[JoinItem] {
        &self.join_items
    }

    pub fn join_items_mut(&mut self) -> &mut [JoinItem] {
        &mut self.join_items
    }

    pub fn add_relationship_path(&mut self, path: RelationshipPath) {
        self.relationship_paths.push(path);
    }

    /// Relationship paths the joins were built from.
    pub fn relationship_paths(&self) -> &[RelationshipPath] {
        &self.relationship_paths
    }

    // ------------------------------------------------------------------
    // Filters, grouping, ordering, pagination
    // ------------------------------------------------------------------

    pub fn add_filter_item(&mut self, item: FilterItem) {
        self.filter_items.push(item);
    }

    pub fn filter_items(&self) -> &[FilterItem] {
        &self.filter_items
    }

    /// Remove and return the filter tree, for rewrites that wrap it.
    pub fn take_filter_items(&mut self) -> Vec<FilterItem> {
        std::mem::take(&mut self.filter_items)
    }

    pub fn add_group_item(&mut self, item: GroupItem) {
        self.group_items.push(item);
    }

    pub fn group_items(&self) -> &[GroupItem] {
        &self.group_items
    }

    pub fn add_order_item(&mut self, item: OrderItem) {
        self.order_items.push(item);
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn set_limit(&mut self, limit: LimitItem) {
        self.limit = Some(limit);
    }

    pub fn limit(&self) -> Option<LimitItem> {
        self.limit
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn add_value_item(&mut self, item: ValueItem) {
        self.values.push(item);
    }

    pub fn values(&self) -> &[ValueItem] {
        &self.values
    }

    // ------------------------------------------------------------------
    // Passthrough, export hints, transactions
    // ------------------------------------------------------------------

    pub fn set_native_sql(&mut self, sql: String) {
        self.native_sql = Some(sql);
    }

    pub fn native_sql(&self) -> Option<&str> {
        self.native_sql.as_deref()
    }

    pub fn set_native_content(&mut self, content: String) {
        self.native_content = Some(content);
    }

    pub fn native_content(&self) -> Option<&str> {
        self.native_content.as_deref()
    }

    pub fn set_file(&mut self, file: String) {
        self.file = Some(file);
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Export filename: `file` when it has an extension, else
    /// `<primary display name>.<file>`.
    pub fn filename(&self) -> Option<String> {
        let file = self.file.as_deref().filter(|f| !f.is_empty())?;
        if file.contains('.') {
            return Some(file.to_string());
        }
        let display = self
            .primary_table_item()
            .map(|t| t.display_name.as_str())
            .unwrap_or("export");
        Some(format!("{display}.{file}"))
    }

    /// Export file type: the extension of `file`, or `file` itself.
    pub fn file_type(&self) -> Option<String> {
        let file = self.file.as_deref().filter(|f| !f.is_empty())?;
        let ty = file.rsplit_once('.').map(|(_, ext)| ext).unwrap_or(file);
        Some(ty.to_lowercase())
    }

    pub fn set_template(&mut self, template: String) {
        self.template = Some(template);
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn add_transaction_action(&mut self, action: Action) {
        self.transaction.push(action);
    }

    pub fn transaction_actions(&self) -> &[Action] {
        &self.transaction
    }

    pub fn transaction_actions_mut(&mut self) -> &mut [Action] {
        &mut self.transaction
    }

    pub fn take_transaction_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.transaction)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the statement. Later calls return the cached statement until
    /// [`rebuild`](Self::rebuild) is called.
    pub fn build(&mut self) -> Result<&Statement> {
        if self.statement.is_none() {
            self.statement = Some(self.render()?);
        }
        self.statement
            .as_ref()
            .ok_or_else(|| Error::malformed("statement was not rendered"))
    }

    /// Discard the cached statement and render again.
    pub fn rebuild(&mut self) -> Result<&Statement> {
        self.statement = None;
        self.build()
    }

    pub fn is_built(&self) -> bool {
        self.statement.is_some()
    }

    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// Row-count statement with the same tables, joins and filters.
    pub fn count(&self) -> Result<Statement> {
        StatementBuilder::new(self.dialect).build_count(self)
    }

    fn render(&self) -> Result<Statement> {
        match self.operation {
            Operation::Sql => {
                let sql = self
                    .native_sql
                    .clone()
                    .ok_or_else(|| Error::null_node("sql"))?;
                Ok(Statement {
                    sql,
                    params: Vec::new(),
                })
            }
            op if op.is_crud() => StatementBuilder::new(self.dialect).build(self),
            op => Err(Error::malformed(format!(
                "{op} operation does not render a statement"
            ))),
        }
    }
}
