//! Error types for the migration engine.

use qm_core::CoreError;
use qm_db::DbError;
use thiserror::Error;

/// Migration engine errors.
///
/// Anything surfacing as an `EngineError` aborts the run. Failures of a
/// single migration script are recorded in the ledger and the run report
/// instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Repository scan or configuration failure (M001).
    #[error("[M001] {0}")]
    Core(#[from] CoreError),

    /// Database failure outside a migration script (M002).
    #[error("[M002] {0}")]
    Db(#[from] DbError),

    /// Ledger table or column introspection failed (M003).
    #[error("[M003] Ledger schema probe failed on '{table}': {source}")]
    SchemaProbe {
        table: String,
        #[source]
        source: DbError,
    },

    /// Reading or writing a ledger record failed (M004).
    #[error("[M004] Ledger operation failed: {0}")]
    Ledger(String),

    /// Rollback failed and the connection could not be reset (M005).
    #[error("[M005] Connection lost after migration '{migration}' failed: {message}")]
    ConnectionLost { migration: String, message: String },

    /// Uninstall is a manual operation (M006).
    #[error("[M006] Uninstall is not performed automatically; drop the ledger manually with: {manual_sql}")]
    UninstallUnsupported { manual_sql: String },
}

/// Result type alias for [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;
