//! Connection double for failure-injection tests.

use async_trait::async_trait;
use qm_core::Engine;
use qm_db::{Connection, DbError, DbResult, DuckDbConnection, SqlResult};
use std::sync::Mutex;

/// Faults to inject into a [`ScriptedConnection`]
#[derive(Debug, Default, Clone)]
pub(crate) struct Faults {
    pub commit: bool,
    pub rollback: bool,
    pub connect: bool,
}

/// In-memory DuckDB connection that records every call and can be told to
/// fail transaction control or reconnects.
pub(crate) struct ScriptedConnection {
    inner: DuckDbConnection,
    engine: Engine,
    faults: Faults,
    calls: Mutex<Vec<String>>,
}

impl ScriptedConnection {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: DuckDbConnection::in_memory().unwrap(),
            engine: Engine::DuckDb,
            faults,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Pretend to be a connection of another engine family
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn connect(&self) -> DbResult<()> {
        self.record("connect");
        if self.faults.connect {
            return Err(DbError::ConnectionError("server went away".to_string()));
        }
        self.inner.connect().await
    }

    async fn disconnect(&self) -> DbResult<()> {
        self.record("disconnect");
        self.inner.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn run_sql(&self, sql: &str) -> DbResult<SqlResult> {
        self.record(sql);
        self.inner.run_sql(sql).await
    }

    async fn transaction_start(&self) -> DbResult<()> {
        self.record("begin");
        self.inner.transaction_start().await
    }

    async fn transaction_commit(&self) -> DbResult<()> {
        self.record("commit");
        if self.faults.commit {
            return Err(DbError::TransactionError("commit refused".to_string()));
        }
        self.inner.transaction_commit().await
    }

    async fn transaction_rollback(&self) -> DbResult<()> {
        self.record("rollback");
        if self.faults.rollback {
            return Err(DbError::TransactionError("connection desynchronized".to_string()));
        }
        self.inner.transaction_rollback().await
    }
}
