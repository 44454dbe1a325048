//! Data contexts: the execution side of a data source.
//!
//! A [`DataContext`] owns the backend connection of one data source and the
//! [`SchemaRegistry`](crate::metadata::SchemaRegistry) its requests resolve
//! against. It runs rendered actions and raw passthrough statements and
//! returns [`Summary`] results.

mod sqlite;
mod summary;

pub use sqlite::SqliteContext;
pub use summary::{Row, Summary};

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value as Json};
use tracing::debug;

use crate::action::Action;
use crate::config::{sqlite_path, DataSourceKind, DataSourceSettings};
use crate::error::{Error, Result};
use crate::metadata::{load_table_configs, SchemaProvider, SchemaSnapshot, TableId};
use crate::sql::Dialect;

/// Execution facade of one data source.
pub trait DataContext: Send + Sync {
    /// Data source name.
    fn source(&self) -> &str;

    fn dialect(&self) -> Dialect;

    /// Current schema snapshot. Hold on to it for the whole request.
    fn schema(&self) -> Arc<SchemaSnapshot>;

    /// Render (if needed) and run a CRUD action.
    fn execute(&self, action: &mut Action) -> Result<Summary>;

    /// Run raw SQL text.
    fn execute_sql(&self, sql: &str) -> Result<Summary>;

    /// Run a statement in the backend's own query language.
    fn execute_native(&self, content: &str) -> Result<Summary>;

    /// Run several actions on one connection, all or nothing.
    fn execute_transaction(&self, actions: &mut [Action]) -> Result<Summary>;

    /// Reload the schema from the backend and swap it in.
    fn refresh_schema(&self) -> Result<()>;
}

/// Open the data context for a configured data source.
pub fn connect(
    name: &str,
    settings: &DataSourceSettings,
    table_config_path: Option<&Path>,
) -> Result<Arc<dyn DataContext>> {
    let kind = settings.kind()?;
    let configs = match table_config_path {
        Some(dir) => load_table_configs(dir, name)?,
        None => Default::default(),
    };
    debug!(source = name, kind = %kind, configs = configs.len(), "Connecting data source");

    match kind {
        DataSourceKind::Sqlite => {
            let url = settings.resolved_url()?;
            let context = SqliteContext::open(name, sqlite_path(&url))?.with_table_configs(configs)?;
            Ok(Arc::new(context))
        }
        other => Err(Error::UnsupportedDataSource(other.to_string())),
    }
}

/// Structure document of one table: names, columns, types and nullability.
pub fn table_structure(schema: &dyn SchemaProvider, table: TableId) -> Json {
    let table = schema.table(table);
    let columns: Vec<Json> = schema
        .columns_of(table.id)
        .into_iter()
        .map(|c| {
            json!({
                "name": c.name,
                "type": c.column_type.name(),
                "nullable": c.nullable,
                "primary_key": c.primary_key,
            })
        })
        .collect();
    json!({
        "name": table.name,
        "display_name": table.display_name,
        "schema": table.schema,
        "columns": columns,
    })
}

/// Structure documents of every table of a source.
pub fn schema_structure(schema: &dyn SchemaProvider) -> Json {
    Json::Array(
        schema
            .tables()
            .iter()
            .map(|t| table_structure(schema, t.id))
            .collect(),
    )
}
