//! Join path resolution over the relationship graph.
//!
//! Given the primary table and the tables a request wants joined, the
//! builder picks relationship paths and turns every edge into a join:
//!
//! 1. Candidate paths are every walk from the primary table to each
//!    requested table.
//! 2. A candidate is accepted when requested tables appear on it in request
//!    order and every table after the first hop is itself requested. Among
//!    accepted candidates the ones passing through the most requested tables
//!    win. With nothing accepted, all shortest candidates are used.
//! 3. Paths are walked edge by edge. A join is keyed by the relationship
//!    prefix that reached it, so a prefix shared by several paths is joined
//!    once.

use std::collections::HashMap;

use tracing::debug;

use crate::action::{
    Action, ColumnItem, JoinItem, JoinKind, SingleColumnJoin, TableItem, TableItemId, TableKind,
};
use crate::error::{Error, Result};
use crate::metadata::{ColumnId, Relationship, RelationshipPath, SchemaProvider, TableId};

/// A table the request asked to join, with the requested join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest {
    pub table: TableId,
    pub kind: JoinKind,
}

impl JoinRequest {
    pub fn new(table: TableId, kind: JoinKind) -> Self {
        Self { table, kind }
    }
}

pub struct JoinBuilder<'a> {
    schema: &'a dyn SchemaProvider,
    join_on_multi_column: bool,
}

impl<'a> JoinBuilder<'a> {
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self {
            schema,
            join_on_multi_column: false,
        }
    }

    /// Join two tables on every relationship between them at once instead of
    /// one join per relationship.
    pub fn join_on_multi_column(mut self, enabled: bool) -> Self {
        self.join_on_multi_column = enabled;
        self
    }

    /// Resolve paths for `requests` and add the joins to `action`.
    pub fn build(
        &self,
        action: &mut Action,
        primary: TableItemId,
        requests: &[JoinRequest],
    ) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let primary_table = action
            .table_item(primary)
            .table
            .ok_or_else(|| Error::TableNotFound(action.table_item(primary).name.clone()))?;

        let paths = self.resolve_paths(primary_table, requests)?;

        let mut kinds: HashMap<TableId, JoinKind> = HashMap::new();
        for request in requests {
            kinds.entry(request.table).or_insert(request.kind);
        }

        // Relationship prefix -> table item the prefix's last edge joined.
        let mut walked: HashMap<Vec<Relationship>, TableItemId> = HashMap::new();
        for path in paths {
            let mut left = primary;
            let mut prefix = Vec::with_capacity(path.len());
            for rel in path.iter() {
                prefix.push(*rel);
                if let Some(&item) = walked.get(&prefix) {
                    left = item;
                    continue;
                }
                let right = self.join_edge(action, left, rel, &kinds);
                walked.insert(prefix.clone(), right);
                left = right;
            }
            debug!(
                primary = %self.schema.table(primary_table).name,
                hops = path.len(),
                "Joined relationship path"
            );
            action.add_relationship_path(path);
        }
        Ok(())
    }

    /// Pick the relationship paths for every requested table, in request order.
    pub fn resolve_paths(
        &self,
        primary: TableId,
        requests: &[JoinRequest],
    ) -> Result<Vec<RelationshipPath>> {
        let mut order: HashMap<TableId, usize> = HashMap::new();
        for (i, request) in requests.iter().enumerate() {
            order.entry(request.table).or_insert(i);
        }

        let mut selected: Vec<RelationshipPath> = Vec::new();
        for request in requests {
            let candidates = self.schema.get_relationships(primary, request.table);
            if candidates.is_empty() {
                return Err(Error::AssociationNotFound {
                    primary: self.schema.table(primary).name.clone(),
                    foreign: self.schema.table(request.table).name.clone(),
                });
            }

            let accepted: Vec<&RelationshipPath> = candidates
                .iter()
                .filter(|p| self.follows_request(p, &order))
                .collect();

            let chosen: Vec<&RelationshipPath> = if accepted.is_empty() {
                let shortest = candidates.iter().map(|p| p.len()).min().unwrap_or(0);
                candidates.iter().filter(|p| p.len() == shortest).collect()
            } else {
                let best = accepted
                    .iter()
                    .map(|p| self.requested_hops(p, &order))
                    .max()
                    .unwrap_or(0);
                accepted
                    .into_iter()
                    .filter(|p| self.requested_hops(p, &order) == best)
                    .collect()
            };

            for path in chosen {
                if selected.contains(path) {
                    continue;
                }
                if self.join_on_multi_column {
                    let tables = self.table_sequence(path);
                    if selected.iter().any(|s| self.table_sequence(s) == tables) {
                        continue;
                    }
                }
                selected.push(path.clone());
            }
        }
        Ok(selected)
    }

    /// Request order is respected and every hop after the first stays
    /// inside the requested tables.
    fn follows_request(&self, path: &RelationshipPath, order: &HashMap<TableId, usize>) -> bool {
        for rel in path.iter().skip(1) {
            let from = self.table_of(rel.primary);
            let to = self.table_of(rel.foreign);
            match (order.get(&from), order.get(&to)) {
                (Some(&previous), Some(&next)) if previous > next => return false,
                (Some(_), Some(_)) => {}
                _ => return false,
            }
        }
        true
    }

    /// Number of requested tables a path passes through before its end.
    fn requested_hops(&self, path: &RelationshipPath, order: &HashMap<TableId, usize>) -> usize {
        let hops = path.len().saturating_sub(1);
        path.iter()
            .take(hops)
            .filter(|rel| order.contains_key(&self.table_of(rel.foreign)))
            .count()
    }

    fn table_sequence(&self, path: &RelationshipPath) -> Vec<TableId> {
        path.iter().map(|rel| self.table_of(rel.foreign)).collect()
    }

    fn table_of(&self, column: ColumnId) -> TableId {
        self.schema.column(column).table
    }

    /// Join the foreign table of `rel` to `left` and return the new table item.
    fn join_edge(
        &self,
        action: &mut Action,
        left: TableItemId,
        rel: &Relationship,
        kinds: &HashMap<TableId, JoinKind>,
    ) -> TableItemId {
        let from = self.table_of(rel.primary);
        let table = self.schema.table(self.table_of(rel.foreign));

        let alias = action.next_table_alias(&table.name);
        let right = action.add_table_item(TableItem {
            table: Some(table.id),
            name: table.name.clone(),
            display_name: table.display_name.clone(),
            schema: table.schema.clone(),
            alias,
            custom_alias: false,
            kind: TableKind::Join,
        });

        let mut relationships = vec![*rel];
        if self.join_on_multi_column {
            let direct = self.schema.direct_relationships(from, table.id);
            if !direct.is_empty() {
                relationships = direct;
            }
        }

        let conditions = relationships
            .iter()
            .map(|r| SingleColumnJoin {
                left: self.column_item(action, r.primary, left),
                right: self.column_item(action, r.foreign, right),
            })
            .collect();

        action.add_join_item(JoinItem {
            kind: kinds.get(&table.id).copied().unwrap_or_default(),
            conditions,
        });
        right
    }

    fn column_item(&self, action: &Action, column: ColumnId, item: TableItemId) -> ColumnItem {
        let col = self.schema.column(column);
        match action.table_item(item).kind {
            TableKind::Main => ColumnItem::column(column, &col.name, col.column_type.clone(), item),
            TableKind::Join => {
                ColumnItem::join_column(column, &col.name, col.column_type.clone(), item)
            }
        }
    }
}
