//! qm-db - Database layer for Quillmigrate
//!
//! This crate provides the `Connection` trait the migration engine runs
//! against, a DuckDB implementation of it, and the SQL dialect adapters that
//! generate ledger DDL and literals for each supported engine family.

pub mod dialect;
pub mod duckdb;
pub mod error;
pub mod traits;

pub use crate::duckdb::DuckDbConnection;
pub use dialect::{dialect_for, Dialect, IdentityRetrieval};
pub use error::{DbError, DbResult};
pub use traits::{Connection, SqlResult};

use qm_core::{DatabaseConfig, Engine};

/// Open a connection for a database target.
///
/// Only DuckDB ships with a bundled driver; other engines are reachable by
/// handing the engine an external [`Connection`] implementation.
pub fn open_connection(config: &DatabaseConfig) -> DbResult<Box<dyn Connection>> {
    match config.engine {
        Engine::DuckDb => {
            let conn = DuckDbConnection::new(&config.path)?;
            log::debug!("Opened DuckDB database at {}", config.path);
            Ok(Box::new(conn))
        }
        other => Err(DbError::NotImplemented {
            backend: other.to_string(),
            feature: "bundled driver".to_string(),
        }),
    }
}
