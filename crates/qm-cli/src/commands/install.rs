//! Install command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::finish_run;
use crate::context::ProjectContext;

/// Execute the install command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = ProjectContext::load(global)?;
    let migrator = project.migrator()?;
    let report = migrator
        .install(&project.roots)
        .await
        .context("Install aborted")?;
    finish_run(&report, args)
}
