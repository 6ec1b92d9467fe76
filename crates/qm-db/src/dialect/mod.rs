//! SQL dialect adapters.
//!
//! One [`Dialect`] per engine family generates the ledger DDL, escapes
//! literals, describes statement-splitting quirks and knows how to read back
//! the id of a freshly inserted ledger row. The trait's default methods
//! produce MySQL SQL; the other engines override only what differs.

mod duckdb;
mod mssql;
mod mysql;
mod postgres;

pub use self::duckdb::DuckDbDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::error::{DbError, DbResult};
use crate::traits::Connection;
use chrono::NaiveDateTime;
use qm_core::{Engine, ScriptFormat, SplitOptions};

/// Column written by the identity column of the ledger table
pub const ID_COLUMN: &str = "id";

/// Datetime format used for literals and for reading datetimes back as text
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ledger columns added after the original table layout. Older installs
/// lack them; [`Dialect::optional_columns`] describes how to add them.
pub const OPTIONAL_COLUMNS: &[&str] = &["skip_flag", "log_id"];

/// How the id of an inserted ledger row is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRetrieval {
    /// Append `RETURNING <id>` to the INSERT
    Returning,
    /// Run this query after the INSERT on the same session
    FollowUpQuery(String),
    /// Send this query in the same batch as the INSERT
    SameBatch(String),
}

impl IdentityRetrieval {
    /// Statements to run, in order; the last one yields the id.
    pub fn statements(&self, insert_sql: &str, id_column: &str) -> Vec<String> {
        match self {
            IdentityRetrieval::Returning => vec![format!("{insert_sql} RETURNING {id_column}")],
            IdentityRetrieval::FollowUpQuery(query) => {
                vec![insert_sql.to_string(), query.clone()]
            }
            IdentityRetrieval::SameBatch(query) => vec![format!("{insert_sql};\n{query}")],
        }
    }
}

/// Engine-specific SQL generation strategy
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Engine family this dialect targets
    fn engine(&self) -> Engine;

    /// Reject connections of another engine family.
    fn check_connection(&self, conn: &dyn Connection) -> DbResult<()> {
        if conn.engine() == self.engine() {
            Ok(())
        } else {
            Err(DbError::ConfigurationError(format!(
                "{} dialect cannot run against a {} connection",
                self.engine(),
                conn.engine()
            )))
        }
    }

    /// Quote an identifier
    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    /// Render a string literal, `NULL` for `None`
    fn string_literal(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => format!("'{}'", v.replace('\\', "\\\\").replace('\'', "''")),
            None => "NULL".to_string(),
        }
    }

    /// Render a datetime literal, `NULL` for `None`
    fn datetime_literal(&self, value: Option<NaiveDateTime>) -> String {
        match value {
            Some(dt) => format!("'{}'", dt.format(DATETIME_FORMAT)),
            None => "NULL".to_string(),
        }
    }

    /// Expression reading a datetime column back as `YYYY-MM-DD HH:MM:SS` text
    fn datetime_as_text(&self, column: &str) -> String {
        format!("DATE_FORMAT({column}, '%Y-%m-%d %H:%i:%s')")
    }

    /// Render a flag value
    fn flag_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Statement-splitting rules for migration scripts
    fn split_options(&self) -> SplitOptions {
        SplitOptions {
            hash_comments: true,
            delimiter_directive: true,
            backslash_escapes: true,
            ..SplitOptions::default()
        }
    }

    /// Section markers of migration files
    fn script_format(&self) -> ScriptFormat {
        ScriptFormat::default()
    }

    /// Definition of the autoincrement primary key column
    fn id_column_definition(&self) -> String {
        "INT NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string()
    }

    /// Type of the migration name column
    fn name_type(&self) -> &'static str {
        "VARCHAR(255)"
    }

    /// Type of script, result and message columns
    fn text_type(&self) -> &'static str {
        "LONGTEXT"
    }

    /// Type of datetime columns
    fn datetime_type(&self) -> &'static str {
        "DATETIME"
    }

    /// Type of flag columns
    fn flag_type(&self) -> &'static str {
        "TINYINT(1)"
    }

    /// Statements creating the ledger table in its original layout
    /// (without [`OPTIONAL_COLUMNS`]).
    fn create_ledger_table(&self, table: &str) -> Vec<String> {
        vec![self.base_ledger_ddl(table, &self.id_column_definition())]
    }

    /// Shared `CREATE TABLE` body; dialects differ only in column types.
    fn base_ledger_ddl(&self, table: &str, id_definition: &str) -> String {
        let q = |c: &str| self.quote_ident(c);
        let text = self.text_type();
        let dt = self.datetime_type();
        let flag = self.flag_type();
        format!(
            "CREATE TABLE {table} (\n  {id} {id_definition},\n  {name} {name_type} NOT NULL,\n  {up_dt} {dt} NULL,\n  {up_script} {text} NOT NULL,\n  {up_result} {text} NULL,\n  {down_dt} {dt} NULL,\n  {down_script} {text} NOT NULL,\n  {down_result} {text} NULL,\n  {failed} {flag} NOT NULL DEFAULT 0,\n  {failed_msg} {text} NULL\n)",
            table = q(table),
            id = q(ID_COLUMN),
            name = q("migration_name"),
            name_type = self.name_type(),
            up_dt = q("up_datetime"),
            up_script = q("up_script"),
            up_result = q("up_result"),
            down_dt = q("down_datetime"),
            down_script = q("down_script"),
            down_result = q("down_result"),
            failed = q("failed_flag"),
            failed_msg = q("failed_message"),
        )
    }

    /// Column definitions for [`OPTIONAL_COLUMNS`], in the same order
    fn optional_columns(&self) -> Vec<(&'static str, String)> {
        vec![
            ("skip_flag", format!("{} NOT NULL DEFAULT 0", self.flag_type())),
            ("log_id", "VARCHAR(10) NULL".to_string()),
        ]
    }

    /// Additive column upgrade
    fn add_column(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_ident(table),
            self.quote_ident(column),
            definition
        )
    }

    /// Query returning a positive count when `table` exists in the current schema
    fn table_exists_query(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = {}",
            self.string_literal(Some(table))
        )
    }

    /// Query returning a positive count when `column` exists on `table`
    fn column_exists_query(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = {} AND column_name = {}",
            self.string_literal(Some(table)),
            self.string_literal(Some(column))
        )
    }

    /// Strategy for reading back the id of an inserted row
    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::FollowUpQuery("SELECT LAST_INSERT_ID()".to_string())
    }

    /// Manual statement for dropping the ledger on uninstall
    fn drop_ledger_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_ident(table))
    }
}

/// Default dialect adapter for an engine family.
pub fn dialect_for(engine: Engine) -> Box<dyn Dialect> {
    match engine {
        Engine::MySql => Box::new(MySqlDialect),
        Engine::Postgres => Box::new(PostgresDialect),
        Engine::MsSql => Box::new(MsSqlDialect),
        Engine::DuckDb => Box::new(DuckDbDialect),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
