//! Error types for the animals API.
//!
//! `DbError` is the single error kind surfaced by the database access layer.
//! Variants separate configuration problems (fatal, never retried) from
//! connectivity problems (token or handshake failures) and query failures.

use thiserror::Error;

/// Boxed error used to preserve underlying causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connectivity error: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Query error: {message}")]
    Query {
        message: String,
        /// e.g., "23505" for unique violation
        sql_state: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connectivity error wrapping the underlying cause.
    pub fn connectivity(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connectivity {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a connectivity error with no underlying cause.
    pub fn connectivity_msg(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
            source: None,
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

/// Convert sqlx errors raised while executing a statement.
///
/// Errors raised while opening a connection are wrapped as connectivity
/// errors by the connection factory instead.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                // Class 28: invalid authorization specification (expired or rejected token)
                if code.as_deref().is_some_and(|c| c.starts_with("28")) {
                    let message = format!("Authentication rejected: {}", db_err.message());
                    return DbError::connectivity(message, sqlx::Error::Database(db_err));
                }
                DbError::query(db_err.message(), code)
            }
            err @ (sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed) => {
                DbError::connectivity(format!("Database connection failed: {err}"), err)
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned", None),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::query(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::query(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::query(format!("Failed to decode column {}: {}", index, source), None)
            }
            sqlx::Error::Decode(source) => DbError::query(format!("Decode error: {}", source), None),
            sqlx::Error::WorkerCrashed => {
                DbError::connectivity_msg("Database connection worker crashed")
            }
            _ => DbError::query(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
