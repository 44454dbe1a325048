//! Data source kinds.
//!
//! A data source is declared in the settings file with a `type` and a `url`:
//!
//! ```toml
//! [datasources.main]
//! type = "sqlite"
//! url = "./data/main.db"
//! ```
//!
//! When `type` is omitted the kind is inferred from the url.

use crate::sql::Dialect;

/// Error type for data source configuration.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Unsupported data source type: {0}. Supported: sqlite, postgres, mysql, sqlserver, duckdb")]
    UnsupportedType(String),

    #[error("Cannot infer data source type from url: {0}")]
    UnknownUrl(String),
}

/// Supported data source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceKind {
    Sqlite,
    Postgres,
    MySql,
    /// Microsoft SQL Server
    SqlServer,
    /// DuckDB (file or in-memory)
    DuckDb,
}

impl DataSourceKind {
    /// Parse a kind from its configured name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, DataSourceError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DataSourceKind::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(DataSourceKind::Postgres),
            "mysql" | "mariadb" => Ok(DataSourceKind::MySql),
            "mssql" | "sqlserver" | "sql_server" => Ok(DataSourceKind::SqlServer),
            "duckdb" | "duck" => Ok(DataSourceKind::DuckDb),
            other => Err(DataSourceError::UnsupportedType(other.to_string())),
        }
    }

    /// Infer the kind from a connection url or file path.
    pub fn from_url(url: &str) -> Result<Self, DataSourceError> {
        let lower = url.to_lowercase();
        if lower.starts_with("sqlite:")
            || lower == ":memory:"
            || lower.ends_with(".db")
            || lower.ends_with(".sqlite")
            || lower.ends_with(".sqlite3")
        {
            Ok(DataSourceKind::Sqlite)
        } else if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Ok(DataSourceKind::Postgres)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Ok(DataSourceKind::MySql)
        } else if lower.starts_with("sqlserver://") || lower.starts_with("mssql://") {
            Ok(DataSourceKind::SqlServer)
        } else if lower.starts_with("duckdb:") || lower.ends_with(".duckdb") {
            Ok(DataSourceKind::DuckDb)
        } else {
            Err(DataSourceError::UnknownUrl(url.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::Sqlite => "sqlite",
            DataSourceKind::Postgres => "postgres",
            DataSourceKind::MySql => "mysql",
            DataSourceKind::SqlServer => "sqlserver",
            DataSourceKind::DuckDb => "duckdb",
        }
    }

    /// SQL dialect used to render statements for this kind.
    pub fn dialect(&self) -> Dialect {
        match self {
            DataSourceKind::Sqlite => Dialect::Sqlite,
            DataSourceKind::Postgres => Dialect::Postgres,
            DataSourceKind::MySql => Dialect::MySql,
            DataSourceKind::SqlServer => Dialect::TSql,
            DataSourceKind::DuckDb => Dialect::DuckDb,
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip a `sqlite:` / `sqlite://` scheme, leaving a file path or `:memory:`.
pub fn sqlite_path(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}
