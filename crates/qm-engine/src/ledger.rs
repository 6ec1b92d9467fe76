//! Migration ledger: the tracking table in the target schema.
//!
//! All SQL is produced by the run's [`Dialect`](qm_db::Dialect); this module
//! only decides which statements to run and how to map rows back to
//! [`LedgerRecord`]s.

use crate::context::RunContext;
use crate::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use qm_core::{LedgerRecord, MigrationName};
use qm_db::dialect::{DATETIME_FORMAT, ID_COLUMN, OPTIONAL_COLUMNS};
use qm_db::{Connection, SqlResult};
use std::collections::BTreeMap;

/// What a read-only probe found out about the ledger schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerProbe {
    pub table_exists: bool,
    pub missing_columns: Vec<&'static str>,
}

/// Inspect the ledger table without changing it.
pub async fn probe(ctx: &RunContext, conn: &dyn Connection) -> EngineResult<LedgerProbe> {
    ctx.check(conn)?;
    let dialect = ctx.dialect();
    let table = ctx.ledger_table();
    if !count_positive(ctx, conn, &dialect.table_exists_query(table)).await? {
        return Ok(LedgerProbe {
            table_exists: false,
            missing_columns: OPTIONAL_COLUMNS.to_vec(),
        });
    }

    let mut missing_columns = Vec::new();
    for column in OPTIONAL_COLUMNS {
        if !count_positive(ctx, conn, &dialect.column_exists_query(table, column)).await? {
            missing_columns.push(*column);
        }
    }
    Ok(LedgerProbe {
        table_exists: true,
        missing_columns,
    })
}

/// Create the ledger table and add missing optional columns.
///
/// Idempotent: an up-to-date ledger is left untouched. Returns the context
/// marked as verified.
pub async fn ensure_schema(ctx: &RunContext, conn: &dyn Connection) -> EngineResult<RunContext> {
    let dialect = ctx.dialect();
    let table = ctx.ledger_table();
    let found = probe(ctx, conn).await?;

    if !found.table_exists {
        log::info!("Creating migration ledger table '{table}'");
        for stmt in dialect.create_ledger_table(table) {
            run_ddl(ctx, conn, &stmt).await?;
        }
    }

    for (column, definition) in dialect.optional_columns() {
        if found.missing_columns.contains(&column) {
            log::info!("Adding column '{column}' to ledger table '{table}'");
            run_ddl(ctx, conn, &dialect.add_column(table, column, &definition)).await?;
        }
    }

    Ok(ctx.verified())
}

/// Authoritative record per migration name.
///
/// Rows sharing a name collapse to the one with the latest `up_datetime`
/// (the higher id wins a tie). Creates the ledger first unless the context
/// says it is already verified.
pub async fn list_all(
    ctx: &RunContext,
    conn: &dyn Connection,
) -> EngineResult<BTreeMap<MigrationName, LedgerRecord>> {
    let ctx = if ctx.ledger_verified() {
        ctx.clone()
    } else {
        ensure_schema(ctx, conn).await?
    };
    let records = list_records(&ctx, conn, &[]).await?;
    Ok(authoritative(records))
}

/// Collapse ledger rows to one record per name.
pub fn authoritative(records: Vec<LedgerRecord>) -> BTreeMap<MigrationName, LedgerRecord> {
    let mut latest: BTreeMap<MigrationName, LedgerRecord> = BTreeMap::new();
    for record in records {
        let replace = match latest.get(&record.migration_name) {
            Some(current) => (record.up_datetime, record.id) >= (current.up_datetime, current.id),
            None => true,
        };
        if replace {
            latest.insert(record.migration_name.clone(), record);
        }
    }
    latest
}

/// Every ledger row in insertion order.
///
/// Columns listed in `missing_columns` are read as their defaults, so an
/// older ledger can be inspected without upgrading it.
pub async fn list_records(
    ctx: &RunContext,
    conn: &dyn Connection,
    missing_columns: &[&str],
) -> EngineResult<Vec<LedgerRecord>> {
    ctx.check(conn)?;
    let dialect = ctx.dialect();
    let q = |c: &str| dialect.quote_ident(c);
    let optional = |column: &str, fallback: &str| {
        if missing_columns.contains(&column) {
            format!("{fallback} AS {}", q(column))
        } else {
            q(column)
        }
    };

    let sql = format!(
        "SELECT {id}, {name}, {up_dt} AS {up_dt_alias}, {up_script}, {up_result}, {down_dt} AS {down_dt_alias}, {down_script}, {down_result}, {failed}, {failed_msg}, {skip}, {log_id} FROM {table} ORDER BY {id}",
        id = q(ID_COLUMN),
        name = q("migration_name"),
        up_dt = dialect.datetime_as_text(&q("up_datetime")),
        up_dt_alias = q("up_datetime"),
        up_script = q("up_script"),
        up_result = q("up_result"),
        down_dt = dialect.datetime_as_text(&q("down_datetime")),
        down_dt_alias = q("down_datetime"),
        down_script = q("down_script"),
        down_result = q("down_result"),
        failed = q("failed_flag"),
        failed_msg = q("failed_message"),
        skip = optional("skip_flag", "0"),
        log_id = optional("log_id", "NULL"),
        table = ctx.quoted_table(),
    );

    let result = conn
        .run_sql(&sql)
        .await
        .map_err(|e| EngineError::Ledger(format!("reading '{}': {e}", ctx.ledger_table())))?;
    let reader = RowReader::new(&result)?;
    result.rows.iter().map(|row| reader.record(row)).collect()
}

/// Insert `record` when it has no id yet, otherwise update it in place.
///
/// On insert the ledger-assigned id is written back into `record`.
pub async fn upsert(
    ctx: &RunContext,
    conn: &dyn Connection,
    record: &mut LedgerRecord,
) -> EngineResult<i64> {
    ctx.check(conn)?;
    let dialect = ctx.dialect();
    let q = |c: &str| dialect.quote_ident(c);
    let text = |v: Option<&str>| dialect.string_literal(v);
    let values = [
        ("up_datetime", dialect.datetime_literal(record.up_datetime)),
        ("up_script", text(Some(&record.up_script))),
        ("up_result", text(record.up_result.as_deref())),
        ("down_datetime", dialect.datetime_literal(record.down_datetime)),
        ("down_script", text(Some(&record.down_script))),
        ("down_result", text(record.down_result.as_deref())),
        ("failed_flag", dialect.flag_literal(record.failed_flag).to_string()),
        ("failed_message", text(record.failed_message.as_deref())),
        ("skip_flag", dialect.flag_literal(record.skip_flag).to_string()),
        ("log_id", text(record.log_id.as_deref())),
    ];

    if let Some(id) = record.id {
        let assignments: Vec<String> = values
            .iter()
            .map(|(column, value)| format!("{} = {value}", q(column)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {id}",
            ctx.quoted_table(),
            assignments.join(", "),
            q(ID_COLUMN)
        );
        conn.run_sql(&sql).await.map_err(|e| {
            EngineError::Ledger(format!("updating record {id} of '{}': {e}", record.migration_name))
        })?;
        log::debug!("Updated ledger record {id} for '{}'", record.migration_name);
        return Ok(id);
    }

    let mut columns = vec![q("migration_name")];
    let mut literals = vec![text(Some(record.migration_name.as_str()))];
    for (column, value) in values {
        columns.push(q(column));
        literals.push(value);
    }
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        ctx.quoted_table(),
        columns.join(", "),
        literals.join(", ")
    );

    let mut last = SqlResult::default();
    for stmt in dialect.identity_retrieval().statements(&insert, &q(ID_COLUMN)) {
        last = conn.run_sql(&stmt).await.map_err(|e| {
            EngineError::Ledger(format!("inserting record for '{}': {e}", record.migration_name))
        })?;
    }
    let id = last
        .first_value()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            EngineError::Ledger(format!(
                "no id returned for new record of '{}'",
                record.migration_name
            ))
        })?;
    record.id = Some(id);
    log::debug!("Inserted ledger record {id} for '{}'", record.migration_name);
    Ok(id)
}

async fn count_positive(ctx: &RunContext, conn: &dyn Connection, sql: &str) -> EngineResult<bool> {
    let result = conn.run_sql(sql).await.map_err(|source| EngineError::SchemaProbe {
        table: ctx.ledger_table().to_string(),
        source,
    })?;
    Ok(result
        .first_value()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_some_and(|n| n > 0))
}

async fn run_ddl(ctx: &RunContext, conn: &dyn Connection, sql: &str) -> EngineResult<()> {
    conn.run_sql(sql)
        .await
        .map(|_| ())
        .map_err(|source| EngineError::SchemaProbe {
            table: ctx.ledger_table().to_string(),
            source,
        })
}

/// Column positions of a ledger `SELECT`
struct RowReader {
    id: usize,
    name: usize,
    up_datetime: usize,
    up_script: usize,
    up_result: usize,
    down_datetime: usize,
    down_script: usize,
    down_result: usize,
    failed_flag: usize,
    failed_message: usize,
    skip_flag: usize,
    log_id: usize,
}

impl RowReader {
    fn new(result: &SqlResult) -> EngineResult<Self> {
        let col = |name: &str| {
            result
                .column_index(name)
                .ok_or_else(|| EngineError::Ledger(format!("ledger query lacks column '{name}'")))
        };
        Ok(Self {
            id: col(ID_COLUMN)?,
            name: col("migration_name")?,
            up_datetime: col("up_datetime")?,
            up_script: col("up_script")?,
            up_result: col("up_result")?,
            down_datetime: col("down_datetime")?,
            down_script: col("down_script")?,
            down_result: col("down_result")?,
            failed_flag: col("failed_flag")?,
            failed_message: col("failed_message")?,
            skip_flag: col("skip_flag")?,
            log_id: col("log_id")?,
        })
    }

    fn record(&self, row: &[Option<String>]) -> EngineResult<LedgerRecord> {
        let get = |idx: usize| row.get(idx).cloned().flatten();
        let id = get(self.id)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| EngineError::Ledger("ledger row without a numeric id".to_string()))?;
        let migration_name = get(self.name)
            .and_then(MigrationName::try_new)
            .ok_or_else(|| EngineError::Ledger(format!("ledger row {id} has no migration name")))?;

        Ok(LedgerRecord {
            id: Some(id),
            migration_name,
            up_datetime: parse_datetime(id, get(self.up_datetime))?,
            up_script: get(self.up_script).unwrap_or_default(),
            up_result: get(self.up_result),
            down_datetime: parse_datetime(id, get(self.down_datetime))?,
            down_script: get(self.down_script).unwrap_or_default(),
            down_result: get(self.down_result),
            failed_flag: parse_flag(get(self.failed_flag)),
            failed_message: get(self.failed_message),
            skip_flag: parse_flag(get(self.skip_flag)),
            log_id: get(self.log_id),
        })
    }
}

fn parse_datetime(id: i64, value: Option<String>) -> EngineResult<Option<NaiveDateTime>> {
    match value {
        None => Ok(None),
        Some(text) => NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
            .map(Some)
            .map_err(|e| EngineError::Ledger(format!("ledger row {id} has bad datetime '{text}': {e}"))),
    }
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("True")
    )
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
