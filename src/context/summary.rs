//! Execution results.

use serde_json::{json, Map, Value as Json};

use crate::action::{Action, LimitItem, Operation};

/// One result row, keyed by column result key.
pub type Row = Map<String, Json>;

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Rows(Vec<Row>),
    Write {
        affected: usize,
        last_insert_id: Option<i64>,
    },
    Structure(Json),
    Transaction(Vec<Summary>),
}

/// What one request produced, plus the hints the caller needs to present it.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    operation: Operation,
    body: Body,
    limit: Option<LimitItem>,
    total: Option<u64>,
    filename: Option<String>,
    file_type: Option<String>,
    template: Option<String>,
}

impl Summary {
    fn new(operation: Operation, body: Body) -> Self {
        Self {
            operation,
            body,
            limit: None,
            total: None,
            filename: None,
            file_type: None,
            template: None,
        }
    }

    /// Rows read by a query action.
    pub fn rows(action: &Action, rows: Vec<Row>) -> Self {
        Self::new(action.operation(), Body::Rows(rows)).with_hints(action)
    }

    /// Rows of a passthrough statement.
    pub fn passthrough(operation: Operation, rows: Vec<Row>) -> Self {
        Self::new(operation, Body::Rows(rows))
    }

    pub fn write(action: &Action, affected: usize, last_insert_id: Option<i64>) -> Self {
        Self::new(
            action.operation(),
            Body::Write {
                affected,
                last_insert_id,
            },
        )
        .with_hints(action)
    }

    /// Row count of a passthrough statement that returns no rows.
    pub fn affected(operation: Operation, affected: usize) -> Self {
        Self::new(
            operation,
            Body::Write {
                affected,
                last_insert_id: None,
            },
        )
    }

    pub fn structure(operation: Operation, structure: Json) -> Self {
        Self::new(operation, Body::Structure(structure))
    }

    pub fn transaction(children: Vec<Summary>) -> Self {
        Self::new(Operation::Transaction, Body::Transaction(children))
    }

    fn with_hints(mut self, action: &Action) -> Self {
        self.limit = action.limit();
        self.filename = action.filename();
        self.file_type = action.file_type();
        self.template = action.template().map(str::to_string);
        self
    }

    /// Total row count behind a paginated query.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Result rows; empty for writes and structures.
    pub fn result_rows(&self) -> &[Row] {
        match &self.body {
            Body::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn affected_rows(&self) -> Option<usize> {
        match self.body {
            Body::Write { affected, .. } => Some(affected),
            _ => None,
        }
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        match self.body {
            Body::Write { last_insert_id, .. } => last_insert_id,
            _ => None,
        }
    }

    pub fn children(&self) -> &[Summary] {
        match &self.body {
            Body::Transaction(children) => children,
            _ => &[],
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn file_type(&self) -> Option<&str> {
        self.file_type.as_deref()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// The result document returned to the caller.
    ///
    /// - `detail`: the first row, or `{}`
    /// - paginated queries: `{start, end, total, data}`
    /// - other queries: the row array
    /// - writes: `{affected_rows}`, plus `last_insert_id` for inserts
    /// - transactions: one document per statement, in request order
    pub fn data(&self) -> Json {
        match &self.body {
            Body::Rows(rows) if self.operation == Operation::Detail => rows
                .first()
                .cloned()
                .map(Json::Object)
                .unwrap_or_else(|| Json::Object(Map::new())),
            Body::Rows(rows) => {
                let data = Json::Array(rows.iter().cloned().map(Json::Object).collect());
                match self.limit {
                    Some(limit) => json!({
                        "start": limit.start,
                        "end": limit.end,
                        "total": self.total.unwrap_or(rows.len() as u64),
                        "data": data,
                    }),
                    None => data,
                }
            }
            Body::Write {
                affected,
                last_insert_id,
            } => {
                let mut doc = Map::new();
                doc.insert("affected_rows".into(), json!(affected));
                if self.operation == Operation::Insert {
                    if let Some(id) = last_insert_id {
                        doc.insert("last_insert_id".into(), json!(id));
                    }
                }
                Json::Object(doc)
            }
            Body::Structure(structure) => structure.clone(),
            Body::Transaction(children) => Json::Array(children.iter().map(Summary::data).collect()),
        }
    }
}
