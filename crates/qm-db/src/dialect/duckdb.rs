//! DuckDB dialect

use super::{Dialect, IdentityRetrieval, ID_COLUMN};
use qm_core::{Engine, SplitOptions};

/// DuckDB dialect adapter.
///
/// DuckDB has no autoincrement keyword; the ledger id is fed by a sequence
/// named after the table. The id carries no index: DuckDB refuses
/// `ALTER TABLE ... ADD COLUMN` on indexed tables, which the optional column
/// upgrade relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbDialect;

impl DuckDbDialect {
    fn sequence_name(table: &str) -> String {
        format!("{table}_{ID_COLUMN}_seq")
    }
}

impl Dialect for DuckDbDialect {
    fn engine(&self) -> Engine {
        Engine::DuckDb
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn string_literal(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => format!("'{}'", v.replace('\'', "''")),
            None => "NULL".to_string(),
        }
    }

    fn datetime_as_text(&self, column: &str) -> String {
        format!("strftime({column}, '%Y-%m-%d %H:%M:%S')")
    }

    fn split_options(&self) -> SplitOptions {
        SplitOptions::default()
    }

    fn id_column_definition(&self) -> String {
        "INTEGER NOT NULL".to_string()
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR"
    }

    fn datetime_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    fn flag_type(&self) -> &'static str {
        "INTEGER"
    }

    fn create_ledger_table(&self, table: &str) -> Vec<String> {
        let sequence = Self::sequence_name(table);
        let id_definition = format!(
            "INTEGER NOT NULL DEFAULT nextval({})",
            self.string_literal(Some(&sequence))
        );
        vec![
            format!(
                "CREATE SEQUENCE IF NOT EXISTS {} START 1",
                self.quote_ident(&sequence)
            ),
            self.base_ledger_ddl(table, &id_definition),
        ]
    }

    fn optional_columns(&self) -> Vec<(&'static str, String)> {
        vec![
            ("skip_flag", "INTEGER DEFAULT 0".to_string()),
            ("log_id", "VARCHAR".to_string()),
        ]
    }

    fn table_exists_query(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = {}",
            self.string_literal(Some(table))
        )
    }

    fn column_exists_query(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = current_schema() AND table_name = {} AND column_name = {}",
            self.string_literal(Some(table)),
            self.string_literal(Some(column))
        )
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::Returning
    }

    fn drop_ledger_table(&self, table: &str) -> String {
        format!(
            "DROP TABLE {}; DROP SEQUENCE {}",
            self.quote_ident(table),
            self.quote_ident(&Self::sequence_name(table))
        )
    }
}
