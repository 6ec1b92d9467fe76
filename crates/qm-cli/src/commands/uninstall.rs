//! Uninstall command implementation
//!
//! Removing the ledger is left to the operator. The command prints the
//! statement to run and exits non-zero without connecting to the database.

use anyhow::Result;
use qm_db::dialect_for;
use qm_engine::{uninstall_unsupported, EngineError};

use crate::cli::GlobalArgs;
use crate::commands::common::ExitCode;
use crate::context::ProjectContext;

/// Execute the uninstall command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let project = ProjectContext::load(global)?;
    let dialect = dialect_for(project.database.engine);
    match uninstall_unsupported(dialect.as_ref(), &project.config.ledger.table) {
        EngineError::UninstallUnsupported { manual_sql } => {
            eprintln!("Uninstall is not performed automatically.");
            eprintln!("To remove the migration ledger, run manually:\n");
            println!("{manual_sql};");
        }
        other => eprintln!("{other}"),
    }
    Err(ExitCode(1).into())
}
