//! Plan command implementation

use anyhow::{Context, Result};
use qm_core::{Direction, MigrationName};
use qm_engine::{Plan, PlanStep};
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputFormat, ReportArgs};
use crate::commands::common::print_json;
use crate::context::ProjectContext;

#[derive(Debug, Serialize)]
struct PlannedStep {
    direction: Direction,
    name: MigrationName,
    /// Ledger record reused by a revert or a retry
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    steps: Vec<PlannedStep>,
    last_applied: Option<MigrationName>,
}

impl From<&Plan> for PlanOutput {
    fn from(plan: &Plan) -> Self {
        let steps = plan
            .steps
            .iter()
            .map(|step| PlannedStep {
                direction: step.direction(),
                name: step.name().clone(),
                ledger_id: match step {
                    PlanStep::Revert { record } => record.id,
                    PlanStep::Apply { record, .. } => record.as_ref().and_then(|r| r.id),
                },
            })
            .collect();
        Self {
            steps,
            last_applied: plan.last_applied.clone(),
        }
    }
}

/// Execute the plan command
pub async fn execute(args: &ReportArgs, global: &GlobalArgs) -> Result<()> {
    let project = ProjectContext::load(global)?;
    let migrator = project.migrator()?;
    let plan = migrator
        .plan(&project.roots)
        .await
        .context("Failed to compute migration plan")?;
    let output = PlanOutput::from(&plan);

    match args.output {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => print_text(&output),
    }
    Ok(())
}

fn print_text(output: &PlanOutput) {
    if output.steps.is_empty() {
        println!("Nothing to do, schema is up to date");
        return;
    }
    for step in &output.steps {
        match (step.direction, step.ledger_id) {
            (Direction::Up, Some(id)) => println!("up    {} (retry, ledger id {id})", step.name),
            (Direction::Up, None) => println!("up    {}", step.name),
            (Direction::Down, _) => println!("down  {}", step.name),
        }
    }
    if let Some(last) = &output.last_applied {
        println!("\nLast applied after this plan: {last}");
    }
}
