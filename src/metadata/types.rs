//! Schema entities: tables, columns, relationships.
//!
//! Tables and columns live in the arena of a [`SchemaSnapshot`](super::SchemaSnapshot)
//! and are referred to by [`TableId`] / [`ColumnId`] handles. Handles compare in O(1)
//! and stay meaningful for as long as the snapshot they came from is alive.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Handle to a table inside one schema snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) u32);

/// Handle to a column inside one schema snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub(crate) u32);

impl TableId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ColumnId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage class of a column, derived from its declared SQL type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Json,
    Blob,
    Other(String),
}

impl ColumnType {
    /// Classify a declared type name (`VARCHAR(20)`, `bigint`, `jsonb`, ...).
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "" => ColumnType::Other(String::new()),
            "JSON" | "JSONB" => ColumnType::Json,
            "BOOL" | "BOOLEAN" | "BIT" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "TIME" => ColumnType::Time,
            "DATETIME" | "DATETIME2" | "TIMESTAMP" | "TIMESTAMPTZ" => ColumnType::Timestamp,
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => ColumnType::Blob,
            b if b.contains("INT") => ColumnType::Integer,
            b if b.contains("CHAR") || b.contains("TEXT") || b.contains("CLOB") => {
                ColumnType::Text
            }
            b if b.contains("REAL")
                || b.contains("FLOA")
                || b.contains("DOUB")
                || b.contains("NUMERIC")
                || b.contains("DECIMAL") =>
            {
                ColumnType::Real
            }
            b if b.starts_with("TIMESTAMP") => ColumnType::Timestamp,
            other => ColumnType::Other(other.to_lowercase()),
        }
    }

    /// Type name as shown in structure documents. Unclassified types keep
    /// their declared name.
    pub fn name(&self) -> &str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Blob => "blob",
            ColumnType::Other(name) if name.is_empty() => "other",
            ColumnType::Other(name) => name,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ColumnType::Json)
    }

    /// Date, time and timestamp columns.
    pub fn is_time_like(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Time | ColumnType::Timestamp)
    }
}

/// A table in a loaded schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub display_name: String,
    /// Owning schema, when the backend has one.
    pub schema: Option<String>,
    /// Alternative name requests may use for this table.
    pub alias: Option<String>,
    pub columns: Vec<ColumnId>,
}

/// A column in a loaded schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub table: TableId,
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Pre-declared associated column, set by table configuration.
    pub relation_column: Option<ColumnId>,
}

/// Cardinality of a relationship between two tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationType {
    #[default]
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl AssociationType {
    /// Cardinality seen from the other side.
    pub fn reverse(self) -> Self {
        match self {
            AssociationType::OneToMany => AssociationType::ManyToOne,
            AssociationType::ManyToOne => AssociationType::OneToMany,
            other => other,
        }
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssociationType::OneToOne => "ONE_TO_ONE",
            AssociationType::OneToMany => "ONE_TO_MANY",
            AssociationType::ManyToOne => "MANY_TO_ONE",
            AssociationType::ManyToMany => "MANY_TO_MANY",
        };
        f.write_str(s)
    }
}

/// Directed edge from a primary column to a foreign column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Relationship {
    pub primary: ColumnId,
    pub foreign: ColumnId,
    pub association: AssociationType,
}

impl Relationship {
    pub fn new(primary: ColumnId, foreign: ColumnId, association: AssociationType) -> Self {
        Self {
            primary,
            foreign,
            association,
        }
    }

    /// The same edge walked the other way.
    pub fn reversed(&self) -> Self {
        Self {
            primary: self.foreign,
            foreign: self.primary,
            association: self.association.reverse(),
        }
    }
}

/// A walk of relationships from one table to another.
///
/// Equality and hashing ignore edge order, so two walks over the same
/// relationships are one path for caching purposes. Iteration keeps the
/// walk order.
#[derive(Debug, Clone)]
pub struct RelationshipPath {
    relationships: Vec<Relationship>,
}

impl RelationshipPath {
    pub fn new(relationships: Vec<Relationship>) -> Self {
        Self { relationships }
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn first(&self) -> Option<&Relationship> {
        self.relationships.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.relationships.iter()
    }

    fn sorted(&self) -> Vec<Relationship> {
        let mut rels = self.relationships.clone();
        rels.sort();
        rels
    }
}

impl PartialEq for RelationshipPath {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }
}

impl Eq for RelationshipPath {}

impl Hash for RelationshipPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

impl<'a> IntoIterator for &'a RelationshipPath {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.relationships.iter()
    }
}
