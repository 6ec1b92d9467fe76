//! Connection trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use qm_core::Engine;

/// Result of running one SQL statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlResult {
    /// Column names of the result set (empty for non-queries)
    pub columns: Vec<String>,

    /// Rows rendered as strings; `None` is SQL NULL
    pub rows: Vec<Vec<Option<String>>>,

    /// Rows affected by a non-query statement
    pub affected_rows: usize,
}

impl SqlResult {
    /// Result of a statement that changed `affected_rows` rows.
    pub fn affected(affected_rows: usize) -> Self {
        Self {
            affected_rows,
            ..Self::default()
        }
    }

    /// First column of the first row, if any and not NULL.
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }

    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// One-line, human readable statement output.
    pub fn summary(&self) -> String {
        if self.columns.is_empty() {
            format!("{} row(s) affected", self.affected_rows)
        } else {
            format!("{} row(s) returned", self.rows.len())
        }
    }
}

/// SQL connection consumed by the migration engine.
///
/// Implementations must be Send + Sync for async operation. The engine uses
/// a connection strictly sequentially: one statement finishes before the
/// next one starts.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Engine family this connection talks to
    fn engine(&self) -> Engine;

    /// Open the connection if it is closed
    async fn connect(&self) -> DbResult<()>;

    /// Close the connection, discarding any open transaction
    async fn disconnect(&self) -> DbResult<()>;

    /// Whether the connection is currently open
    fn is_connected(&self) -> bool;

    /// Execute a single statement
    async fn run_sql(&self, sql: &str) -> DbResult<SqlResult>;

    /// Begin a transaction
    async fn transaction_start(&self) -> DbResult<()>;

    /// Commit the current transaction
    async fn transaction_commit(&self) -> DbResult<()>;

    /// Roll back the current transaction
    async fn transaction_rollback(&self) -> DbResult<()>;
}
