//! Immutable schema snapshot and the builder that produces it.
//!
//! A snapshot owns every [`Table`] and [`Column`] of one data source in an
//! arena, plus a directed graph with one edge per relationship direction.
//! Declared relationships are stored once; the graph also carries their
//! reversed form so path search can walk either way.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::types::{
    AssociationType, Column, ColumnId, ColumnType, Relationship, Table, TableId,
};
use crate::error::{Error, Result};

/// Schema of one data source at one point in time.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub(crate) source: String,
    pub(crate) tables: Vec<Table>,
    pub(crate) columns: Vec<Column>,
    /// Lowercased table name, display name and alias to table.
    pub(crate) table_index: HashMap<String, TableId>,
    pub(crate) relationships: Vec<Relationship>,
    pub(crate) graph: DiGraph<TableId, Relationship>,
    pub(crate) node_indices: HashMap<TableId, NodeIndex>,
}

impl SchemaSnapshot {
    /// An empty schema for `source`.
    pub fn empty(source: impl Into<String>) -> Self {
        SchemaBuilder::new(source).build()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Relationships as declared, one per edge.
    pub fn declared_relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub(crate) fn lookup_table(&self, name: &str) -> Option<&Table> {
        self.table_index
            .get(&name.to_lowercase())
            .map(|id| &self.tables[id.index()])
    }

    pub(crate) fn lookup_column(&self, table: TableId, name: &str) -> Option<&Column> {
        let table = self.tables.get(table.index())?;
        let mut columns = table.columns.iter().map(|id| &self.columns[id.index()]);
        columns.clone().find(|c| c.name == name).or_else(|| {
            columns.find(|c| c.name.eq_ignore_ascii_case(name))
        })
    }
}

/// Accumulates tables, columns and relationships into a [`SchemaSnapshot`].
#[derive(Debug)]
pub struct SchemaBuilder {
    source: String,
    tables: Vec<Table>,
    columns: Vec<Column>,
    relationships: Vec<Relationship>,
}

impl SchemaBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tables: vec![],
            columns: vec![],
            relationships: vec![],
        }
    }

    pub fn add_table(&mut self, name: &str, schema: Option<&str>) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(Table {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            schema: schema.map(str::to_string),
            alias: None,
            columns: vec![],
        });
        id
    }

    pub fn add_column(
        &mut self,
        table: TableId,
        name: &str,
        column_type: ColumnType,
        nullable: bool,
    ) -> ColumnId {
        let id = ColumnId(self.columns.len() as u32);
        self.columns.push(Column {
            id,
            table,
            name: name.to_string(),
            column_type,
            nullable,
            primary_key: false,
            relation_column: None,
        });
        self.tables[table.index()].columns.push(id);
        id
    }

    /// Add a table whose columns are all nullable text, with `id` as primary key when present.
    pub fn table(&mut self, name: &str, columns: &[&str]) -> TableId {
        let table = self.add_table(name, None);
        for column in columns {
            let id = self.add_column(table, column, ColumnType::Text, true);
            if *column == "id" {
                self.columns[id.index()].primary_key = true;
            }
        }
        table
    }

    pub fn set_primary_key(&mut self, column: ColumnId) {
        self.columns[column.index()].primary_key = true;
    }

    pub fn set_display_name(&mut self, table: TableId, display_name: &str) {
        self.tables[table.index()].display_name = display_name.to_string();
    }

    pub fn set_alias(&mut self, table: TableId, alias: &str) {
        self.tables[table.index()].alias = Some(alias.to_string());
    }

    pub fn set_relation_column(&mut self, column: ColumnId, related: ColumnId) {
        self.columns[column.index()].relation_column = Some(related);
    }

    pub fn find_table(&self, name: &str) -> Option<TableId> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.id)
    }

    pub fn find_column(&self, table: TableId, name: &str) -> Option<ColumnId> {
        self.tables[table.index()]
            .columns
            .iter()
            .copied()
            .find(|id| self.columns[id.index()].name.eq_ignore_ascii_case(name))
    }

    pub fn relate(&mut self, primary: ColumnId, foreign: ColumnId, association: AssociationType) {
        let rel = Relationship::new(primary, foreign, association);
        if !self.relationships.contains(&rel) {
            self.relationships.push(rel);
        }
    }

    /// Relate two `table.column` references.
    pub fn relate_names(
        &mut self,
        primary: &str,
        foreign: &str,
        association: AssociationType,
    ) -> Result<()> {
        let primary = self.resolve_column_ref(primary)?;
        let foreign = self.resolve_column_ref(foreign)?;
        self.relate(primary, foreign, association);
        Ok(())
    }

    fn resolve_column_ref(&self, reference: &str) -> Result<ColumnId> {
        let (table, column) = reference
            .split_once('.')
            .ok_or_else(|| Error::ColumnNotFound(reference.to_string()))?;
        let table = self
            .find_table(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        self.find_column(table, column)
            .ok_or_else(|| Error::ColumnNotFound(reference.to_string()))
    }

    pub fn build(self) -> SchemaSnapshot {
        let mut table_index = HashMap::new();
        for table in &self.tables {
            table_index.entry(table.name.to_lowercase()).or_insert(table.id);
        }
        // Real names win over display names and aliases.
        for table in &self.tables {
            table_index
                .entry(table.display_name.to_lowercase())
                .or_insert(table.id);
            if let Some(alias) = &table.alias {
                table_index.entry(alias.to_lowercase()).or_insert(table.id);
            }
        }

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        for table in &self.tables {
            node_indices.insert(table.id, graph.add_node(table.id));
        }
        for rel in &self.relationships {
            let from = self.columns[rel.primary.index()].table;
            let to = self.columns[rel.foreign.index()].table;
            graph.add_edge(node_indices[&from], node_indices[&to], *rel);
            graph.add_edge(node_indices[&to], node_indices[&from], rel.reversed());
        }

        SchemaSnapshot {
            source: self.source,
            tables: self.tables,
            columns: self.columns,
            table_index,
            relationships: self.relationships,
            graph,
            node_indices,
        }
    }
}
