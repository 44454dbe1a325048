//! Path finding over the relationship graph.
//!
//! Join resolution needs every simple walk between two tables, not just the
//! shortest one, so the search enumerates all of them up to a depth limit.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::schema::SchemaSnapshot;
use super::types::{AssociationType, Relationship, RelationshipPath, TableId};

/// Longest walk considered between two tables.
pub const MAX_PATH_DEPTH: usize = 5;

impl SchemaSnapshot {
    /// Find all simple paths between two tables (up to `max_depth` edges).
    ///
    /// Paths never revisit a table. Results are deduplicated by relationship
    /// set and ordered shortest first, ties broken by relationship order so
    /// the output is deterministic.
    pub fn find_all_paths(
        &self,
        from: TableId,
        to: TableId,
        max_depth: usize,
    ) -> Vec<RelationshipPath> {
        if from == to {
            return vec![];
        }
        let (Some(&from_idx), Some(&to_idx)) =
            (self.node_indices.get(&from), self.node_indices.get(&to))
        else {
            return vec![];
        };

        let mut results: Vec<Vec<Relationship>> = vec![];
        let mut stack: Vec<(NodeIndex, Vec<Relationship>, HashSet<NodeIndex>)> = vec![];

        let mut initial_visited = HashSet::new();
        initial_visited.insert(from_idx);
        stack.push((from_idx, vec![], initial_visited));

        while let Some((current, path, visited)) = stack.pop() {
            if path.len() >= max_depth {
                continue;
            }

            for edge_ref in self.graph.edges(current) {
                let neighbor = edge_ref.target();
                if visited.contains(&neighbor) {
                    continue;
                }

                let mut new_path = path.clone();
                new_path.push(*edge_ref.weight());

                if neighbor == to_idx {
                    results.push(new_path);
                } else {
                    let mut new_visited = visited.clone();
                    new_visited.insert(neighbor);
                    stack.push((neighbor, new_path, new_visited));
                }
            }
        }

        results.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let mut seen = HashSet::new();
        results
            .into_iter()
            .map(RelationshipPath::new)
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }

    /// Cardinality of the first direct relationship from `from` to `to`.
    pub fn direct_association(&self, from: TableId, to: TableId) -> Option<AssociationType> {
        self.direct_relationships(from, to)
            .first()
            .map(|rel| rel.association)
    }

    /// Every relationship edge leading from `from` straight to `to`, in declaration order.
    pub fn direct_relationships(&self, from: TableId, to: TableId) -> Vec<Relationship> {
        let (Some(&from_idx), Some(&to_idx)) =
            (self.node_indices.get(&from), self.node_indices.get(&to))
        else {
            return vec![];
        };
        let mut rels: Vec<(usize, Relationship)> = self
            .graph
            .edges_connecting(from_idx, to_idx)
            .map(|e| (e.id().index(), *e.weight()))
            .collect();
        rels.sort_by_key(|(idx, _)| *idx);
        rels.into_iter().map(|(_, rel)| rel).collect()
    }
}
