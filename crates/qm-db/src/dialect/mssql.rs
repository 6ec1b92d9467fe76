//! Microsoft SQL Server dialect

use super::{Dialect, IdentityRetrieval};
use chrono::NaiveDateTime;
use qm_core::{Engine, SplitOptions};

/// MSSQL dialect adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl Dialect for MsSqlDialect {
    fn engine(&self) -> Engine {
        Engine::MsSql
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn string_literal(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => format!("N'{}'", v.replace('\'', "''")),
            None => "NULL".to_string(),
        }
    }

    // ISO 8601 with a `T` is the only unambiguous DATETIME2 literal
    // regardless of the session's DATEFORMAT/LANGUAGE settings.
    fn datetime_literal(&self, value: Option<NaiveDateTime>) -> String {
        match value {
            Some(dt) => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S")),
            None => "NULL".to_string(),
        }
    }

    fn datetime_as_text(&self, column: &str) -> String {
        format!("CONVERT(VARCHAR(19), {column}, 120)")
    }

    fn split_options(&self) -> SplitOptions {
        SplitOptions {
            batch_separator: Some("GO".to_string()),
            ..SplitOptions::default()
        }
    }

    fn id_column_definition(&self) -> String {
        "INT IDENTITY(1,1) NOT NULL PRIMARY KEY".to_string()
    }

    fn name_type(&self) -> &'static str {
        "NVARCHAR(255)"
    }

    fn text_type(&self) -> &'static str {
        "NVARCHAR(MAX)"
    }

    fn datetime_type(&self) -> &'static str {
        "DATETIME2"
    }

    fn flag_type(&self) -> &'static str {
        "TINYINT"
    }

    fn optional_columns(&self) -> Vec<(&'static str, String)> {
        vec![
            ("skip_flag", "TINYINT NOT NULL DEFAULT 0".to_string()),
            ("log_id", "NVARCHAR(10) NULL".to_string()),
        ]
    }

    fn add_column(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.quote_ident(table),
            self.quote_ident(column),
            definition
        )
    }

    fn table_exists_query(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_NAME = {}",
            self.string_literal(Some(table))
        )
    }

    fn column_exists_query(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_NAME = {} AND COLUMN_NAME = {}",
            self.string_literal(Some(table)),
            self.string_literal(Some(column))
        )
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::SameBatch("SELECT CAST(SCOPE_IDENTITY() AS INT) AS id".to_string())
    }
}
