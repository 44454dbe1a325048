//! Items an [`Action`](super::Action) is assembled from.
//!
//! Items refer to schema entities by handle ([`TableId`], [`ColumnId`]) and to
//! each other by [`TableItemId`]; the action owns every item.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::metadata::{ColumnId, ColumnType, TableId};
use crate::sql::SortDir;

/// Index of a [`TableItem`] inside one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableItemId(pub(crate) usize);

impl TableItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ============================================================================
// Tables
// ============================================================================

/// How a table entered the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Named by the operation key (`FROM`).
    Main,
    /// Bound by the relationship resolver.
    Join,
}

/// A table reference inside one query.
#[derive(Debug, Clone, PartialEq)]
pub struct TableItem {
    /// Schema table, or `None` for an expression-only reference the schema
    /// could not validate.
    pub table: Option<TableId>,
    /// Table name, or the raw reference for expression-only items.
    pub name: String,
    pub display_name: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
    /// The alias came from the request and must not be rewritten.
    pub custom_alias: bool,
    pub kind: TableKind,
}

impl TableItem {
    /// Name the rest of the statement refers to this table by.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_expression(&self) -> bool {
        self.table.is_none()
    }
}

// ============================================================================
// Columns
// ============================================================================

/// What a [`ColumnItem`] points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnTarget {
    /// Column of a main table.
    Column {
        column: ColumnId,
        table_item: TableItemId,
    },
    /// Column of a table bound through a join.
    JoinColumn {
        column: ColumnId,
        table_item: TableItemId,
    },
    /// Free-form SQL (function call, literal) with no schema column behind it.
    Expression(String),
}

/// A projected, filtered, grouped or ordered column reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnItem {
    pub target: ColumnTarget,
    /// Column name; the expression text for expression items.
    pub name: String,
    pub column_type: ColumnType,
    pub alias: Option<String>,
    pub custom_alias: bool,
}

impl ColumnItem {
    pub fn column(
        column: ColumnId,
        name: impl Into<String>,
        column_type: ColumnType,
        table_item: TableItemId,
    ) -> Self {
        Self {
            target: ColumnTarget::Column { column, table_item },
            name: name.into(),
            column_type,
            alias: None,
            custom_alias: false,
        }
    }

    pub fn join_column(
        column: ColumnId,
        name: impl Into<String>,
        column_type: ColumnType,
        table_item: TableItemId,
    ) -> Self {
        Self {
            target: ColumnTarget::JoinColumn { column, table_item },
            name: name.into(),
            column_type,
            alias: None,
            custom_alias: false,
        }
    }

    /// Expression column. Rejects text that could end the statement early.
    pub fn expression(expression: impl Into<String>) -> Result<Self> {
        let expression = expression.into();
        if [";", "--", "/*"].iter().any(|t| expression.contains(t)) {
            return Err(Error::malformed(format!(
                "column expression [{expression}] contains a statement terminator or comment"
            )));
        }
        Ok(Self {
            target: ColumnTarget::Expression(expression.clone()),
            name: expression,
            column_type: ColumnType::Other(String::new()),
            alias: None,
            custom_alias: false,
        })
    }

    pub fn with_alias(mut self, alias: impl Into<String>, custom: bool) -> Self {
        self.alias = Some(alias.into());
        self.custom_alias = custom;
        self
    }

    pub fn schema_column(&self) -> Option<ColumnId> {
        match &self.target {
            ColumnTarget::Column { column, .. } | ColumnTarget::JoinColumn { column, .. } => {
                Some(*column)
            }
            ColumnTarget::Expression(_) => None,
        }
    }

    pub fn table_item(&self) -> Option<TableItemId> {
        match &self.target {
            ColumnTarget::Column { table_item, .. } | ColumnTarget::JoinColumn { table_item, .. } => {
                Some(*table_item)
            }
            ColumnTarget::Expression(_) => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.target, ColumnTarget::Expression(_))
    }

    /// Key this column appears under in a result row.
    pub fn result_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// Joins
// ============================================================================

/// Join kind requested for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Parse a join kind key as used in `{"inner": "table"}`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inner" | "join" => Ok(JoinKind::Inner),
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "full" => Ok(JoinKind::Full),
            _ => Err(Error::UnsupportedJoinType(s.to_string())),
        }
    }
}

/// One `left = right` pair of a join condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleColumnJoin {
    pub left: ColumnItem,
    pub right: ColumnItem,
}

/// One JOIN clause; several conditions are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinItem {
    pub kind: JoinKind,
    pub conditions: Vec<SingleColumnJoin>,
}

impl JoinItem {
    pub fn new(left: ColumnItem, right: ColumnItem, kind: JoinKind) -> Self {
        Self {
            kind,
            conditions: vec![SingleColumnJoin { left, right }],
        }
    }

    /// Table item the join brings in.
    pub fn right_table_item(&self) -> Option<TableItemId> {
        self.conditions.first().and_then(|c| c.right.table_item())
    }

    pub fn left_table_item(&self) -> Option<TableItemId> {
        self.conditions.first().and_then(|c| c.left.table_item())
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Boolean connector between sibling filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "and" => Ok(Connector::And),
            "or" => Ok(Connector::Or),
            _ => Err(Error::malformed(format!("Unsupported connector[{s}]"))),
        }
    }
}

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    StrongEqual,
    NotEqual,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Between,
    Like,
    NotLike,
    Null,
    NotNull,
}

impl Operator {
    /// Operator symbol in the filter string syntax.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equal | Operator::In | Operator::Between | Operator::Null => "=",
            Operator::StrongEqual => "==",
            Operator::NotEqual | Operator::NotIn | Operator::NotNull => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "%=",
            Operator::NotLike => "!%=",
        }
    }

    /// Number of values the operator consumes: `None` for a list.
    pub fn arity(self) -> Option<usize> {
        match self {
            Operator::Null | Operator::NotNull => Some(0),
            Operator::In | Operator::NotIn => None,
            Operator::Between => Some(2),
            _ => Some(1),
        }
    }
}

/// Raw operand(s) of a filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    None,
    Single(String),
    Many(Vec<String>),
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    Condition {
        connector: Connector,
        column: ColumnItem,
        operator: Operator,
        value: FilterValue,
    },
    Group {
        connector: Connector,
        items: Vec<FilterItem>,
    },
    /// Trusted SQL predicate injected by a permission policy.
    Expression {
        connector: Connector,
        expression: String,
    },
}

impl FilterItem {
    pub fn connector(&self) -> Connector {
        match self {
            FilterItem::Condition { connector, .. }
            | FilterItem::Group { connector, .. }
            | FilterItem::Expression { connector, .. } => *connector,
        }
    }

    pub fn set_connector(&mut self, value: Connector) {
        match self {
            FilterItem::Condition { connector, .. }
            | FilterItem::Group { connector, .. }
            | FilterItem::Expression { connector, .. } => *connector = value,
        }
    }

    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.set_connector(connector);
        self
    }
}

// ============================================================================
// Group / order / limit / values
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GroupItem {
    pub column: ColumnItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub column: ColumnItem,
    pub dir: SortDir,
}

/// Pagination window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitItem {
    pub start: u64,
    pub end: u64,
}

impl LimitItem {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    pub fn limit(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// JSON document sent as text.
    Json(String),
}

impl Value {
    /// Convert a request JSON value into a parameter.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Json(other.to_string()),
        }
    }

    /// Convert filter text into a parameter typed after the column it is compared with.
    pub fn coerce(raw: &str, column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => raw
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            ColumnType::Real => raw
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            ColumnType::Boolean => match raw.to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::Text(raw.to_string()),
            },
            ColumnType::Json => Value::Json(raw.to_string()),
            _ => Value::Text(raw.to_string()),
        }
    }
}

/// One column assignment of an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueItem {
    pub column: ColumnId,
    pub name: String,
    pub column_type: ColumnType,
    pub value: Value,
}
