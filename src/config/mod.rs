//! Configuration module for jsonql.
//!
//! Handles data source configuration, environment variables, and settings.

mod datasource;
mod settings;

pub use datasource::{sqlite_path, DataSourceError, DataSourceKind};
pub use settings::{
    expand_env_vars, DataSourceSettings, MetadataSettings, PermissionPolicyKind, RefreshPolicy,
    Settings, SettingsError,
};
