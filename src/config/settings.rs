//! TOML-based configuration for jsonql.
//!
//! Supports a config file (jsonql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! default_datasource = "main"
//! table_config_path = "./tables"
//! permission_policy = "static"
//! join_on_multi_column = false
//! association_connector = "__"
//! sql = false
//! native = false
//!
//! [datasources.main]
//! type = "sqlite"
//! url = "${APP_DB_PATH}"
//!
//! [metadata]
//! refresh_policy = "interval"
//! refresh_interval = 300
//!
//! [[permissions.tables]]
//! table = "users"
//! action = "query"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::datasource::{DataSourceError, DataSourceKind};
use crate::permission::PermissionFacts;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Data source not configured: {0}")]
    DataSourceNotFound(String),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named data sources.
    pub datasources: BTreeMap<String, DataSourceSettings>,

    /// Source used when a request does not name one.
    pub default_datasource: Option<String>,

    /// Directory holding `<source>/<table>.json` table config files.
    pub table_config_path: Option<PathBuf>,

    /// Which permission policy guards requests.
    pub permission_policy: PermissionPolicyKind,

    /// Schema metadata configuration.
    pub metadata: MetadataSettings,

    /// Combine parallel relationships between two tables into one join.
    pub join_on_multi_column: bool,

    /// Separator for generated join-column aliases (`table<conn>column`).
    pub association_connector: String,

    /// Enable the raw `sql` passthrough operation.
    pub sql: bool,

    /// Enable the `native` passthrough operation.
    pub native: bool,

    /// Static permission facts, used when `permission_policy = "static"`.
    pub permissions: PermissionFacts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            datasources: BTreeMap::new(),
            default_datasource: None,
            table_config_path: None,
            permission_policy: PermissionPolicyKind::None,
            metadata: MetadataSettings::default(),
            join_on_multi_column: false,
            association_connector: "__".to_string(),
            sql: false,
            native: false,
            permissions: PermissionFacts::default(),
        }
    }
}

/// Data source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceSettings {
    /// Data source type (sqlite, postgres, ...). Inferred from `url` when absent.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Connection url or file path (supports ${ENV_VAR} expansion).
    pub url: String,

    /// Default schema for this data source.
    #[serde(default)]
    pub schema: Option<String>,
}

impl DataSourceSettings {
    /// Get the data source kind.
    pub fn kind(&self) -> Result<DataSourceKind, SettingsError> {
        let kind = match &self.kind {
            Some(kind) => DataSourceKind::from_str(kind)?,
            None => DataSourceKind::from_url(&self.resolved_url()?)?,
        };
        Ok(kind)
    }

    /// Get the url with environment variables expanded.
    pub fn resolved_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.url)
    }
}

/// Permission policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicyKind {
    /// Every request passes.
    #[default]
    None,
    /// Requests are checked against `[permissions]`.
    Static,
}

/// Schema refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    #[default]
    None,
    Interval,
}

/// Metadata configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub refresh_policy: RefreshPolicy,

    /// Refresh interval in seconds.
    pub refresh_interval: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            refresh_policy: RefreshPolicy::None,
            refresh_interval: 300,
        }
    }
}

impl MetadataSettings {
    /// The refresh period, when interval refresh is enabled.
    pub fn refresh_period(&self) -> Option<Duration> {
        match self.refresh_policy {
            RefreshPolicy::Interval => Some(Duration::from_secs(self.refresh_interval.max(1))),
            RefreshPolicy::None => None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `JSONQL_CONFIG`
    /// 2. `./jsonql.toml`
    /// 3. `~/.config/jsonql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var("JSONQL_CONFIG") {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("jsonql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("jsonql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Get a data source by name.
    pub fn get_datasource(&self, name: &str) -> Result<&DataSourceSettings, SettingsError> {
        self.datasources
            .get(name)
            .ok_or_else(|| SettingsError::DataSourceNotFound(name.to_string()))
    }

    /// Name of the source used when a request names none.
    ///
    /// The explicit `default_datasource`, else a source called "default",
    /// else the first source by name.
    pub fn default_datasource_name(&self) -> Option<&str> {
        if let Some(name) = &self.default_datasource {
            return Some(name.as_str());
        }
        if self.datasources.contains_key("default") {
            return Some("default");
        }
        self.datasources.keys().next().map(String::as_str)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next(); // consume '}'
            name
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            std::iter::from_fn(|| chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_'))
                .collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
