//! PostgreSQL dialect

use super::{Dialect, IdentityRetrieval};
use qm_core::{Engine, SplitOptions};

/// PostgreSQL dialect adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn engine(&self) -> Engine {
        Engine::Postgres
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
        format!("TO_CHAR({column}, 'YYYY-MM-DD HH24:MI:SS')")
    }

    fn split_options(&self) -> SplitOptions {
        SplitOptions {
            dollar_quotes: true,
            escape_strings: true,
            ..SplitOptions::default()
        }
    }

    fn id_column_definition(&self) -> String {
        "SERIAL PRIMARY KEY".to_string()
    }

    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    fn datetime_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    fn flag_type(&self) -> &'static str {
        "SMALLINT"
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
}
