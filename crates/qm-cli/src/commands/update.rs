//! Update command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::finish_run;
use crate::context::ProjectContext;

/// Execute the update command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = ProjectContext::load(global)?;
    let migrator = project.migrator()?;
    let report = migrator
        .update(&project.roots)
        .await
        .context("Update aborted")?;
    finish_run(&report, args)
}
