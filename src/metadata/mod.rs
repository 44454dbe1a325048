//! Schema model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     SchemaRegistry                       │
//! │        RwLock<Arc<SchemaSnapshot>>, swapped on refresh   │
//! └──────────────────────────────────────────────────────────┘
//!                           │ snapshot()
//!                           ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     SchemaSnapshot                       │
//! │  arena: Vec<Table>, Vec<Column>  (TableId / ColumnId)    │
//! │  graph: DiGraph<TableId, Relationship> (both directions) │
//! └──────────────────────────────────────────────────────────┘
//!                           │ implements
//!                           ▼
//!                    SchemaProvider trait
//! ```
//!
//! Snapshots are built with a [`SchemaBuilder`], either by a data context
//! introspecting its backend or directly in tests, and can be decorated with
//! [table configs](table_config).

mod path;
mod provider;
mod registry;
mod schema;
pub mod table_config;
mod types;

pub use path::MAX_PATH_DEPTH;
pub use provider::SchemaProvider;
pub use registry::SchemaRegistry;
pub use schema::{SchemaBuilder, SchemaSnapshot};
pub use table_config::{load_table_configs, TableConfig};
pub use types::*;
