//! DuckDB connection backend

use crate::error::{DbError, DbResult};
use crate::traits::{Connection, SqlResult};
use async_trait::async_trait;
use qm_core::Engine;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB connection.
///
/// Holds a root handle to the database for its whole lifetime; the working
/// connection is a clone of it, so a `disconnect`/`connect` cycle lands on the
/// same database (in-memory ones included) with a fresh session.
pub struct DuckDbConnection {
    root: Mutex<duckdb::Connection>,
    active: Mutex<Option<duckdb::Connection>>,
}

impl DuckDbConnection {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let root = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::from_root(root)
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let root = duckdb::Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Self::from_root(root)
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_root(root: duckdb::Connection) -> DbResult<Self> {
        let active = root
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            root: Mutex::new(root),
            active: Mutex::new(Some(active)),
        })
    }

    fn lock_active(&self) -> DbResult<MutexGuard<'_, Option<duckdb::Connection>>> {
        self.active
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn execute_sync(&self, sql: &str) -> DbResult<SqlResult> {
        let guard = self.lock_active()?;
        let conn = guard.as_ref().ok_or(DbError::NotConnected)?;

        if !returns_rows(sql) {
            let affected = conn.execute(sql, []).map_err(|e| DbError::execution(sql, e))?;
            return Ok(SqlResult::affected(affected));
        }

        let mut stmt = conn.prepare(sql).map_err(|e| DbError::execution(sql, e))?;
        // DuckDB panics on column_count() before execution, so collect rows first
        let rows: Vec<Vec<Option<String>>> = stmt
            .query_map([], |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count).map(|i| column_value(row, i)).collect())
            })
            .map_err(|e| DbError::execution(sql, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::execution(sql, e))?;

        let columns = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map_or("?".to_string(), |v| v.to_string())
            })
            .collect();

        Ok(SqlResult {
            columns,
            affected_rows: 0,
            rows,
        })
    }

    fn control_sync(&self, sql: &str) -> DbResult<()> {
        let guard = self.lock_active()?;
        let conn = guard.as_ref().ok_or(DbError::NotConnected)?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))
    }
}

#[async_trait]
impl Connection for DuckDbConnection {
    fn engine(&self) -> Engine {
        Engine::DuckDb
    }

    async fn connect(&self) -> DbResult<()> {
        let mut active = self.lock_active()?;
        if active.is_none() {
            let root = self
                .root
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            let conn = root
                .try_clone()
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            *active = Some(conn);
            log::debug!("DuckDB session opened");
        }
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        let mut active = self.lock_active()?;
        if active.take().is_some() {
            log::debug!("DuckDB session closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    async fn run_sql(&self, sql: &str) -> DbResult<SqlResult> {
        self.execute_sync(sql)
    }

    async fn transaction_start(&self) -> DbResult<()> {
        self.control_sync("BEGIN TRANSACTION")
    }

    async fn transaction_commit(&self) -> DbResult<()> {
        self.control_sync("COMMIT")
    }

    async fn transaction_rollback(&self) -> DbResult<()> {
        self.control_sync("ROLLBACK")
    }
}

/// Whether a statement produces a result set that must be read back.
fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    const QUERY_KEYWORDS: &[&str] = &[
        "SELECT", "WITH", "SHOW", "DESCRIBE", "PRAGMA", "VALUES", "EXPLAIN", "SUMMARIZE", "FROM",
    ];
    let first = upper
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    QUERY_KEYWORDS.contains(&first)
        || upper
            .split_whitespace()
            .any(|token| token == "RETURNING")
}

/// Read a column value as a String, trying multiple DuckDB types.
///
/// DuckDB integer columns fail for `Option<String>`, so we try
/// String -> i64 -> f64 -> bool. SQL NULL is `None`.
fn column_value(row: &duckdb::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(v) = row.get::<_, Option<String>>(idx) {
        return v;
    }
    if let Ok(v) = row.get::<_, Option<i64>>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.get::<_, Option<f64>>(idx) {
        return v.map(|f| f.to_string());
    }
    if let Ok(v) = row.get::<_, Option<bool>>(idx) {
        return v.map(|b| b.to_string());
    }
    None
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
