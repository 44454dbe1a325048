//! Per-table configuration files.
//!
//! Files live at `<table_config_path>/<source>/<table>.json`:
//!
//! ```json
//! {
//!   "display_name": "Orders",
//!   "alias": "order",
//!   "columns": {
//!     "customer_id": {
//!       "association": { "target_table": "customers", "target_column": "id", "type": "MANY_TO_ONE" }
//!     }
//!   }
//! }
//! ```
//!
//! Associations declared here become relationships in addition to whatever
//! the backend reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::schema::SchemaBuilder;
use super::types::AssociationType;
use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    pub display_name: Option<String>,
    pub alias: Option<String>,
    pub columns: BTreeMap<String, ColumnConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub association: Option<AssociationConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssociationConfig {
    pub target_table: String,
    pub target_column: String,
    #[serde(rename = "type", default)]
    pub association_type: AssociationType,
}

/// Load every `<table>.json` under `<dir>/<source>`, keyed by table name.
///
/// A missing directory yields no configs.
pub fn load_table_configs(dir: &Path, source: &str) -> Result<BTreeMap<String, TableConfig>> {
    let dir = dir.join(source);
    let mut configs = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(configs);
    }

    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(table) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path)?;
        let config: TableConfig = serde_json::from_str(&content)?;
        debug!(source, table, "Loaded table config");
        configs.insert(table.to_string(), config);
    }

    Ok(configs)
}

/// Apply table configs to a schema under construction.
///
/// Configs naming unknown tables or columns are skipped with a warning.
pub fn apply_table_configs(builder: &mut SchemaBuilder, configs: &BTreeMap<String, TableConfig>) {
    for (table_name, config) in configs {
        let Some(table) = builder.find_table(table_name) else {
            warn!(table = %table_name, "Table config for unknown table");
            continue;
        };
        if let Some(display_name) = &config.display_name {
            builder.set_display_name(table, display_name);
        }
        if let Some(alias) = &config.alias {
            builder.set_alias(table, alias);
        }

        for (column_name, column_config) in &config.columns {
            let Some(assoc) = &column_config.association else {
                continue;
            };
            let column = builder.find_column(table, column_name);
            let target = builder
                .find_table(&assoc.target_table)
                .and_then(|t| builder.find_column(t, &assoc.target_column));
            match (column, target) {
                (Some(column), Some(target)) => {
                    builder.set_relation_column(column, target);
                    builder.relate(column, target, assoc.association_type);
                }
                _ => warn!(
                    table = %table_name,
                    column = %column_name,
                    target = %format!("{}.{}", assoc.target_table, assoc.target_column),
                    "Association references unknown column"
                ),
            }
        }
    }
}
