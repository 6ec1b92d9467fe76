//! Error types for qm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// A single statement failed (D002)
    #[error("[D002] SQL execution failed: {message}")]
    ExecutionError { statement: String, message: String },

    /// Transaction start/commit/rollback failed (D003)
    #[error("[D003] Transaction failed: {0}")]
    TransactionError(String),

    /// Dialect and connection disagree on engine family (D004)
    #[error("[D004] Configuration error: {0}")]
    ConfigurationError(String),

    /// No bundled driver for this engine (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Operation attempted on a disconnected connection (D007)
    #[error("[D007] Not connected to the database")]
    NotConnected,
}

impl DbError {
    /// Build an [`DbError::ExecutionError`] for `statement`.
    pub fn execution(statement: &str, message: impl ToString) -> Self {
        DbError::ExecutionError {
            statement: statement.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
