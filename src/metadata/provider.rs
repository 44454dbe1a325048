//! SchemaProvider trait definition.
//!
//! The parser and the relationship resolver only see the schema through this
//! trait. [`SchemaSnapshot`] is the in-memory implementation every data
//! context hands out.

use super::path::MAX_PATH_DEPTH;
use super::schema::SchemaSnapshot;
use super::types::{
    AssociationType, Column, ColumnId, Relationship, RelationshipPath, Table, TableId,
};

/// Read access to one data source's tables, columns and relationships.
///
/// Handle lookups (`table`, `column`) index the arena directly; passing a
/// handle from another snapshot is a logic error and panics.
pub trait SchemaProvider: Send + Sync {
    /// Name of the data source this schema belongs to.
    fn source(&self) -> &str;

    fn tables(&self) -> &[Table];

    fn table(&self, id: TableId) -> &Table;

    fn column(&self, id: ColumnId) -> &Column;

    /// Look up a table by name, display name or configured alias.
    fn get_table(&self, name: &str) -> Option<&Table>;

    /// Look up a table in a specific owning schema.
    fn get_table_in(&self, schema: &str, name: &str) -> Option<&Table>;

    fn get_column(&self, table: TableId, name: &str) -> Option<&Column>;

    fn get_column_in(&self, schema: &str, table: &str, name: &str) -> Option<&Column>;

    /// Every relationship path between two tables, shortest first.
    fn get_relationships(&self, from: TableId, to: TableId) -> Vec<RelationshipPath>;

    fn get_association_type(&self, from: TableId, to: TableId) -> Option<AssociationType>;

    /// Relationships leading from `from` straight to `to`, in declaration order.
    fn direct_relationships(&self, from: TableId, to: TableId) -> Vec<Relationship>;

    /// Columns of a table, in declaration order.
    fn columns_of(&self, table: TableId) -> Vec<&Column> {
        self.table(table)
            .columns
            .iter()
            .map(|id| self.column(*id))
            .collect()
    }
}

impl SchemaProvider for SchemaSnapshot {
    fn source(&self) -> &str {
        &self.source
    }

    fn tables(&self) -> &[Table] {
        &self.tables
    }

    fn table(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.index()]
    }

    fn get_table(&self, name: &str) -> Option<&Table> {
        self.lookup_table(name)
    }

    fn get_table_in(&self, schema: &str, name: &str) -> Option<&Table> {
        self.lookup_table(name).filter(|t| match &t.schema {
            Some(s) => s.eq_ignore_ascii_case(schema),
            // Backends without schemas accept any qualifier.
            None => true,
        })
    }

    fn get_column(&self, table: TableId, name: &str) -> Option<&Column> {
        self.lookup_column(table, name)
    }

    fn get_column_in(&self, schema: &str, table: &str, name: &str) -> Option<&Column> {
        let table = self.get_table_in(schema, table)?;
        self.lookup_column(table.id, name)
    }

    fn get_relationships(&self, from: TableId, to: TableId) -> Vec<RelationshipPath> {
        self.find_all_paths(from, to, MAX_PATH_DEPTH)
    }

    fn get_association_type(&self, from: TableId, to: TableId) -> Option<AssociationType> {
        self.direct_association(from, to)
    }

    fn direct_relationships(&self, from: TableId, to: TableId) -> Vec<Relationship> {
        SchemaSnapshot::direct_relationships(self, from, to)
    }
}
