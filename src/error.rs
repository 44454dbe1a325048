//! Crate-wide error type.
//!
//! Every failure a request can hit surfaces as one [`Error`]. Use
//! [`Error::kind`] to branch on the failure category rather than matching
//! every variant.

use crate::config::SettingsError;

/// Failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request document is structurally wrong.
    MalformedRequest,
    /// A referenced table or column does not exist.
    Schema,
    /// No relationship path connects two tables.
    Relationship,
    /// The permission policy rejected the request.
    Permission,
    /// The backend reported an error while executing.
    Backend,
    /// A transaction spans more than one data source.
    CrossSourceTransaction,
    /// Settings or data source registration is invalid.
    Configuration,
}

/// Errors produced while translating or executing a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Multiple operations were found in the Json data.")]
    MultipleOperations,

    #[error("No operations were found in the Json data.")]
    NoOperation,

    #[error("{0}")]
    Malformed(String),

    #[error("invalid filter condition: {0}")]
    InvalidFilter(String),

    #[error("invalid order condition: {0}")]
    InvalidOrder(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("Unsupported join type[{0}]")]
    UnsupportedJoinType(String),

    #[error("Association relation not found for the table [{primary}] and [{foreign}]")]
    AssociationNotFound { primary: String, foreign: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cross-data source transactions are not supported.")]
    CrossSourceTransaction,

    #[error("datasource not exist: {0}")]
    DataSourceNotFound(String),

    #[error("DataContext [{0}] already exists")]
    DuplicateDataSource(String),

    #[error("{0} operation is disabled")]
    OperationDisabled(&'static str),

    #[error("unsupported datasource type: {0}")]
    UnsupportedDataSource(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),

    /// A statement inside a transaction failed and so did the rollback.
    #[error("rollback failed ({rollback}) after error: {source}")]
    Rollback {
        #[source]
        source: Box<Error>,
        rollback: Box<Error>,
    },
}

impl Error {
    /// Convenience constructor for malformed request nodes.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    /// `"<attr> node value is null"` for present-but-null attributes.
    pub fn null_node(attr: &str) -> Self {
        Error::Malformed(format!("{attr} node value is null"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MultipleOperations
            | Error::NoOperation
            | Error::Malformed(_)
            | Error::InvalidFilter(_)
            | Error::InvalidOrder(_)
            | Error::UnsupportedJoinType(_)
            | Error::Json(_) => ErrorKind::MalformedRequest,
            Error::TableNotFound(_) | Error::ColumnNotFound(_) => ErrorKind::Schema,
            Error::AssociationNotFound { .. } => ErrorKind::Relationship,
            Error::PermissionDenied(_) => ErrorKind::Permission,
            Error::CrossSourceTransaction => ErrorKind::CrossSourceTransaction,
            Error::DataSourceNotFound(_)
            | Error::DuplicateDataSource(_)
            | Error::OperationDisabled(_)
            | Error::UnsupportedDataSource(_)
            | Error::Settings(_) => ErrorKind::Configuration,
            Error::Sqlite(_) | Error::Io(_) | Error::Backend(_) | Error::Rollback { .. } => {
                ErrorKind::Backend
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
