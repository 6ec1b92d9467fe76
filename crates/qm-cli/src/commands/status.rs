//! Status command implementation

use anyhow::{Context, Result};
use qm_engine::StatusEntry;

use crate::cli::{GlobalArgs, OutputFormat, ReportArgs};
use crate::commands::common::print_json;
use crate::context::ProjectContext;

/// Execute the status command
pub async fn execute(args: &ReportArgs, global: &GlobalArgs) -> Result<()> {
    let project = ProjectContext::load(global)?;
    let migrator = project.migrator()?;
    let entries = migrator
        .status(&project.roots)
        .await
        .context("Failed to read migration status")?;

    match args.output {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text => print_table(&entries),
    }
    Ok(())
}

fn print_table(entries: &[StatusEntry]) {
    if entries.is_empty() {
        println!("No migrations found");
        return;
    }

    let width = entries
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    println!(
        "{:<width$}  {:<14}  {:>5}  {:<19}  {:<19}  FILE",
        "NAME", "STATE", "ID", "UP", "DOWN"
    );
    for entry in entries {
        let id = entry.id.map(|id| id.to_string()).unwrap_or_default();
        let up = entry
            .up_datetime
            .map(|dt| dt.to_string())
            .unwrap_or_default();
        let down = entry
            .down_datetime
            .map(|dt| dt.to_string())
            .unwrap_or_default();
        let file = if entry.in_repository { "yes" } else { "no" };
        println!(
            "{:<width$}  {:<14}  {:>5}  {:<19}  {:<19}  {file}",
            entry.name.as_str(),
            entry.state.to_string(),
            id,
            up,
            down
        );
        if let Some(message) = &entry.failed_message {
            let log = entry
                .log_id
                .as_deref()
                .map(|id| format!(" (log id {id})"))
                .unwrap_or_default();
            println!("{:<width$}  ! {message}{log}", "");
        }
    }
}
