//! Holder of the current schema snapshot for one data source.
//!
//! Readers clone the `Arc` and keep using that snapshot for the whole
//! request. A refresh builds a complete new snapshot and swaps the pointer,
//! so an in-flight request never observes a half-updated schema.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::schema::SchemaSnapshot;

#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaSnapshot>>,
    generation: AtomicU64,
}

impl SchemaRegistry {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            generation: AtomicU64::new(0),
        }
    }

    /// The snapshot new requests should use.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Install a new snapshot, returning the one it replaced.
    pub fn swap(&self, snapshot: SchemaSnapshot) -> Arc<SchemaSnapshot> {
        let tables = snapshot.tables.len();
        let new = Arc::new(snapshot);
        let old = std::mem::replace(&mut *self.current.write(), new);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(source = %old.source, tables, generation, "Swapped schema snapshot");
        old
    }

    /// Number of swaps so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
