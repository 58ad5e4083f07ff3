use thiserror::Error;

use crate::model::Backend;

/// Unified error taxonomy for the access layer.
///
/// Driver-native error values never cross this boundary; each backend module
/// flattens its driver's diagnostics into one of these four kinds.
#[derive(Debug, Error)]
pub enum DbError {
    /// Caller misuse: invalid family, blank SQL, bad escape-element name.
    #[error("programmer error: {0}")]
    Programmer(String),

    /// The build lacks the driver required for the resolved backend, or the
    /// enabled drivers cannot read the detected on-disk format.
    #[error("environment error: {0}")]
    Environment(String),

    /// The physical connection attempt failed, or a database file's header
    /// did not match any recognized format.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The backend reported a statement failure.
    #[error("SQL error [{backend}]: {message}; query: {sql}")]
    Sql {
        backend: Backend,
        message: String,
        sql: String,
    },
}

impl DbError {
    /// Normalize a driver-reported execution failure.
    pub(crate) fn sql(backend: Backend, message: impl Into<String>, sql: &str) -> Self {
        DbError::Sql {
            backend,
            message: message.into(),
            sql: sql.to_string(),
        }
    }

    pub(crate) fn connectivity(message: impl Into<String>) -> Self {
        DbError::Connectivity(message.into())
    }
}
