//! Immutable per-run context threaded through ledger, planner and executor.

use crate::error::EngineResult;
use qm_db::{Connection, Dialect};
use std::sync::Arc;
use uuid::Uuid;

/// Values shared by every component during one migration run.
///
/// A context never changes once built; steps that establish new facts about
/// the run (such as a verified ledger schema) return a new context.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    ledger_table: String,
    dialect: Arc<dyn Dialect>,
    ledger_verified: bool,
}

impl RunContext {
    /// Create a context for a new run with a fresh run id.
    pub fn new(ledger_table: impl Into<String>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            ledger_table: ledger_table.into(),
            dialect,
            ledger_verified: false,
        }
    }

    /// Same context with an explicit run id.
    pub fn with_run_id(self, run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..self
        }
    }

    /// Same context, marked as having a verified ledger schema.
    pub fn verified(&self) -> Self {
        Self {
            ledger_verified: true,
            ..self.clone()
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Unquoted ledger table name
    pub fn ledger_table(&self) -> &str {
        &self.ledger_table
    }

    /// Ledger table name quoted for the dialect
    pub fn quoted_table(&self) -> String {
        self.dialect.quote_ident(&self.ledger_table)
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Whether the ledger table and its optional columns are known to exist
    pub fn ledger_verified(&self) -> bool {
        self.ledger_verified
    }

    /// Fail with a configuration error unless `conn` belongs to the engine
    /// family of this context's dialect.
    pub fn check(&self, conn: &dyn Connection) -> EngineResult<()> {
        self.dialect.check_connection(conn)?;
        Ok(())
    }
}
