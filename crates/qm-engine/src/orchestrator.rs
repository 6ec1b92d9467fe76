//! Migration orchestrator: the `install`/`update`/`uninstall` entry points.

use crate::context::RunContext;
use crate::error::{EngineError, EngineResult};
use crate::error_logger::{ErrorLogger, LogErrorLogger};
use crate::executor;
use crate::ledger;
use crate::planner::{self, Plan, PlanStep};
use crate::report::RunReport;
use chrono::NaiveDateTime;
use qm_core::{
    Config, LedgerRecord, Migration, MigrationName, MigrationRepository, MigrationState,
};
use qm_core::config::DEFAULT_LEDGER_TABLE;
use qm_db::{dialect_for, Connection, Dialect};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// One line of `status` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub name: MigrationName,
    pub state: MigrationState,

    /// Ledger id; `None` for migrations never attempted
    pub id: Option<i64>,
    pub up_datetime: Option<NaiveDateTime>,
    pub down_datetime: Option<NaiveDateTime>,
    pub failed_message: Option<String>,
    pub log_id: Option<String>,

    /// Whether the migration file is currently in the repository
    pub in_repository: bool,
}

/// Wires repository, ledger, planner and executor against one connection.
pub struct Migrator {
    conn: Arc<dyn Connection>,
    dialect: Arc<dyn Dialect>,
    repository: MigrationRepository,
    ledger_table: String,
    logger: Arc<dyn ErrorLogger>,
}

impl Migrator {
    /// Create a migrator for `conn` using `dialect`.
    ///
    /// Fails with a configuration error when the dialect targets another
    /// engine family than the connection.
    pub fn new(conn: Arc<dyn Connection>, dialect: Arc<dyn Dialect>) -> EngineResult<Self> {
        dialect.check_connection(conn.as_ref())?;
        let repository = MigrationRepository::new(
            dialect.script_format(),
            dialect.split_options(),
            "sql",
        );
        Ok(Self {
            conn,
            dialect,
            repository,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            logger: Arc::new(LogErrorLogger),
        })
    }

    /// Create a migrator from project configuration.
    ///
    /// The dialect is the one for the engine configured for `target` (or the
    /// default database), so a connection to any other engine is rejected.
    pub fn from_config(
        config: &Config,
        target: Option<&str>,
        conn: Arc<dyn Connection>,
    ) -> EngineResult<Self> {
        let database = config.get_database_config(target)?;
        let dialect: Arc<dyn Dialect> = Arc::from(dialect_for(database.engine));
        let repository = MigrationRepository::new(
            dialect.script_format(),
            dialect.split_options(),
            config.file_extension.clone(),
        );
        Ok(Self::new(conn, dialect)?
            .with_ledger_table(config.ledger.table.clone())
            .with_repository(repository))
    }

    pub fn with_ledger_table(self, table: impl Into<String>) -> Self {
        Self {
            ledger_table: table.into(),
            ..self
        }
    }

    pub fn with_repository(self, repository: MigrationRepository) -> Self {
        Self { repository, ..self }
    }

    pub fn with_error_logger(self, logger: Arc<dyn ErrorLogger>) -> Self {
        Self { logger, ..self }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Ensure the ledger schema, then apply the full diff.
    pub async fn install(&self, roots: &[PathBuf]) -> EngineResult<RunReport> {
        let migrations = self.scan(roots)?;
        let ctx = ledger::ensure_schema(&self.context(), self.conn.as_ref()).await?;
        self.converge(&ctx, &migrations).await
    }

    /// Apply the diff between repository and ledger.
    ///
    /// Same outcome as [`install`](Self::install); the ledger is created on
    /// first read when missing.
    pub async fn update(&self, roots: &[PathBuf]) -> EngineResult<RunReport> {
        let migrations = self.scan(roots)?;
        self.converge(&self.context(), &migrations).await
    }

    /// Compute the plan without writing anything, not even the ledger table.
    pub async fn plan(&self, roots: &[PathBuf]) -> EngineResult<Plan> {
        let migrations = self.scan(roots)?;
        let records = self.read_only_records(&self.context()).await?;
        Ok(planner::plan(&migrations, &ledger::authoritative(records)))
    }

    /// Ledger records with their derived state, followed by repository
    /// migrations that were never attempted.
    pub async fn status(&self, roots: &[PathBuf]) -> EngineResult<Vec<StatusEntry>> {
        let migrations = self.scan(roots)?;
        let available: BTreeSet<&MigrationName> = migrations.iter().map(|m| &m.name).collect();
        let records = self.read_only_records(&self.context()).await?;
        let recorded: BTreeSet<MigrationName> =
            records.iter().map(|r| r.migration_name.clone()).collect();

        let mut entries: Vec<StatusEntry> = records
            .into_iter()
            .map(|record| status_entry(record, &available))
            .collect();
        entries.extend(
            migrations
                .iter()
                .filter(|m| !recorded.contains(&m.name))
                .map(|m| StatusEntry {
                    name: m.name.clone(),
                    state: MigrationState::Pending,
                    id: None,
                    up_datetime: None,
                    down_datetime: None,
                    failed_message: None,
                    log_id: None,
                    in_repository: true,
                }),
        );
        Ok(entries)
    }

    /// Always fails with [`EngineError::UninstallUnsupported`], carrying the
    /// statement that drops the ledger by hand.
    pub fn uninstall(&self) -> EngineResult<()> {
        Err(uninstall_unsupported(self.dialect(), &self.ledger_table))
    }

    fn context(&self) -> RunContext {
        RunContext::new(self.ledger_table.clone(), Arc::clone(&self.dialect))
    }

    fn scan(&self, roots: &[PathBuf]) -> EngineResult<Vec<Migration>> {
        let migrations = self.repository.scan_sources(roots)?;
        log::debug!("Found {} migration(s)", migrations.len());
        Ok(migrations)
    }

    async fn read_only_records(&self, ctx: &RunContext) -> EngineResult<Vec<LedgerRecord>> {
        let found = ledger::probe(ctx, self.conn.as_ref()).await?;
        if !found.table_exists {
            return Ok(Vec::new());
        }
        ledger::list_records(ctx, self.conn.as_ref(), &found.missing_columns).await
    }

    async fn converge(&self, ctx: &RunContext, migrations: &[Migration]) -> EngineResult<RunReport> {
        let conn = self.conn.as_ref();
        let records = ledger::list_all(ctx, conn).await?;
        let plan = planner::plan(migrations, &records);
        log::info!(
            "Run {}: {} revert(s), {} apply(s)",
            ctx.run_id(),
            plan.reverts().count(),
            plan.applies().count()
        );

        let mut report = RunReport::new(ctx.run_id(), plan.last_applied.clone());
        for step in plan.steps {
            let outcome = match step {
                PlanStep::Revert { record } => {
                    executor::apply_down(ctx, conn, self.logger.as_ref(), record).await?
                }
                PlanStep::Apply { migration, record } => {
                    executor::apply_up(ctx, conn, self.logger.as_ref(), &migration, record).await?
                }
            };
            report.push(outcome);
        }

        if !report.is_success() {
            log::warn!(
                "Run {} finished with {} failed migration(s)",
                ctx.run_id(),
                report.failed()
            );
        }
        Ok(report)
    }
}

/// The error every uninstall request ends in, with the manual drop statement
/// for `dialect`.
pub fn uninstall_unsupported(dialect: &dyn Dialect, ledger_table: &str) -> EngineError {
    EngineError::UninstallUnsupported {
        manual_sql: dialect.drop_ledger_table(ledger_table),
    }
}

fn status_entry(record: LedgerRecord, available: &BTreeSet<&MigrationName>) -> StatusEntry {
    StatusEntry {
        state: record.state(),
        in_repository: available.contains(&record.migration_name),
        name: record.migration_name,
        id: record.id,
        up_datetime: record.up_datetime,
        down_datetime: record.down_datetime,
        failed_message: record.failed_message,
        log_id: record.log_id,
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
