//! Migration executor: runs one script transactionally and records the
//! outcome in the ledger.
//!
//! A failing script is rolled back, logged through the [`ErrorLogger`] and
//! written to the ledger as failed; it is reported, never re-thrown. Only a
//! connection that cannot be recovered after a failed rollback, or a ledger
//! write that fails, aborts the run.

use crate::context::RunContext;
use crate::error::{EngineError, EngineResult};
use crate::error_logger::ErrorLogger;
use crate::ledger;
use crate::report::{StepReport, StepStatus};
use chrono::{NaiveDateTime, Timelike, Utc};
use qm_core::{split_statements, Direction, LedgerRecord, Migration, MigrationName};
use qm_db::{Connection, DbError};

/// Message stored when a revert has nothing to execute
pub const NO_DOWN_SCRIPT: &str = "no down script";

/// Why a script did not commit
struct ScriptFailure {
    /// Outputs of the statements that ran before the failure
    outputs: Vec<String>,
    error: DbError,
}

/// Apply a migration's up-script.
///
/// `record` is the earlier failed attempt when retrying; its id is reused.
pub async fn apply_up(
    ctx: &RunContext,
    conn: &dyn Connection,
    logger: &dyn ErrorLogger,
    migration: &Migration,
    record: Option<LedgerRecord>,
) -> EngineResult<StepReport> {
    ctx.check(conn)?;
    let mut record = record.unwrap_or_else(|| LedgerRecord::for_migration(migration));
    record.up_script = migration.up_script.clone();
    record.down_script = migration.down_script.clone();
    record.up_datetime = Some(now());
    record.down_datetime = None;
    record.down_result = None;

    let statements = split_statements(&migration.up_script, &ctx.dialect().split_options());
    log::debug!(
        "Applying '{}' ({} statement(s))",
        migration.name,
        statements.len()
    );

    match run_in_transaction(conn, &statements).await {
        Ok(outputs) => {
            record.up_result = Some(outputs.join("\n"));
            mark_succeeded(&mut record);
            ledger::upsert(ctx, conn, &mut record).await?;
            log::info!("Applied migration '{}'", migration.name);
            Ok(report(&record, Direction::Up, record.up_result.clone()))
        }
        Err(failure) => {
            recover(conn, &migration.name, &failure.error).await?;
            record.up_result = Some(failure.outputs.join("\n"));
            let context = format!("apply migration '{}'", migration.name);
            mark_failed(&mut record, logger, &context, &failure.error);
            ledger::upsert(ctx, conn, &mut record).await?;
            log::warn!("Migration '{}' failed: {}", migration.name, failure.error);
            Ok(report(&record, Direction::Up, record.up_result.clone()))
        }
    }
}

/// Revert a migration using the down-script stored in its ledger record.
pub async fn apply_down(
    ctx: &RunContext,
    conn: &dyn Connection,
    logger: &dyn ErrorLogger,
    record: LedgerRecord,
) -> EngineResult<StepReport> {
    ctx.check(conn)?;
    let mut record = record;
    let name = record.migration_name.clone();
    record.down_datetime = Some(now());

    let statements = split_statements(&record.down_script, &ctx.dialect().split_options());
    if statements.is_empty() {
        record.down_result = None;
        record.failed_flag = true;
        record.failed_message = Some(NO_DOWN_SCRIPT.to_string());
        record.log_id = None;
        ledger::upsert(ctx, conn, &mut record).await?;
        log::warn!("Cannot revert '{name}': {NO_DOWN_SCRIPT}");
        return Ok(report(&record, Direction::Down, None));
    }

    log::debug!("Reverting '{name}' ({} statement(s))", statements.len());
    match run_in_transaction(conn, &statements).await {
        Ok(outputs) => {
            record.down_result = Some(outputs.join("\n"));
            mark_succeeded(&mut record);
            ledger::upsert(ctx, conn, &mut record).await?;
            log::info!("Reverted migration '{name}'");
            Ok(report(&record, Direction::Down, record.down_result.clone()))
        }
        Err(failure) => {
            recover(conn, &name, &failure.error).await?;
            record.down_result = Some(failure.outputs.join("\n"));
            let context = format!("revert migration '{name}'");
            mark_failed(&mut record, logger, &context, &failure.error);
            ledger::upsert(ctx, conn, &mut record).await?;
            log::warn!("Revert of '{name}' failed: {}", failure.error);
            Ok(report(&record, Direction::Down, record.down_result.clone()))
        }
    }
}

/// Run `statements` in one transaction, stopping at the first failure.
///
/// On failure nothing has been rolled back yet; the caller must call
/// [`recover`].
async fn run_in_transaction(
    conn: &dyn Connection,
    statements: &[String],
) -> Result<Vec<String>, ScriptFailure> {
    conn.transaction_start()
        .await
        .map_err(|error| ScriptFailure {
            outputs: Vec::new(),
            error,
        })?;

    let mut outputs = Vec::with_capacity(statements.len());
    for stmt in statements {
        log::debug!("Executing: {stmt}");
        match conn.run_sql(stmt).await {
            Ok(result) => outputs.push(result.summary()),
            Err(error) => return Err(ScriptFailure { outputs, error }),
        }
    }

    match conn.transaction_commit().await {
        Ok(()) => Ok(outputs),
        Err(error) => Err(ScriptFailure { outputs, error }),
    }
}

/// Roll back after a failure, resetting the connection if the rollback
/// itself fails.
async fn recover(conn: &dyn Connection, name: &MigrationName, cause: &DbError) -> EngineResult<()> {
    let rollback_error = match conn.transaction_rollback().await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    log::warn!("Rollback after '{name}' failed ({rollback_error}); resetting connection");

    if let Err(e) = conn.disconnect().await {
        log::debug!("Disconnect during reset failed: {e}");
    }
    conn.connect()
        .await
        .map_err(|reconnect_error| EngineError::ConnectionLost {
            migration: name.to_string(),
            message: format!(
                "{cause}; rollback failed: {rollback_error}; reconnect failed: {reconnect_error}"
            ),
        })
}

fn mark_succeeded(record: &mut LedgerRecord) {
    record.failed_flag = false;
    record.failed_message = None;
    record.log_id = None;
}

fn mark_failed(record: &mut LedgerRecord, logger: &dyn ErrorLogger, context: &str, error: &DbError) {
    record.failed_flag = true;
    record.failed_message = Some(error.to_string());
    record.log_id = Some(logger.log_error(context, error));
}

fn report(record: &LedgerRecord, direction: Direction, output: Option<String>) -> StepReport {
    StepReport {
        name: record.migration_name.clone(),
        direction,
        status: if record.failed_flag {
            StepStatus::Failed
        } else {
            StepStatus::Ok
        },
        ledger_id: record.id,
        output,
        error: record.failed_message.clone(),
        log_id: record.log_id.clone(),
    }
}

/// Current UTC time at the ledger's one-second resolution
fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
