//! Per-run migration report.

use qm_core::{Direction, MigrationName};
use serde::Serialize;
use std::fmt;

/// Maximum characters of an error message shown in a report line
pub const EXCERPT_LEN: usize = 200;

/// Outcome of a single plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Failed,
}

/// Result of executing one migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: MigrationName,
    pub direction: Direction,
    pub status: StepStatus,

    /// Ledger id the outcome was written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<i64>,

    /// Concatenated statement outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Correlation id of the logged error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

impl StepReport {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            StepStatus::Ok => "OK",
            StepStatus::Failed => "FAILED",
        };
        write!(f, "{status:<6}  {:<4}  {}", self.direction.to_string(), self.name)?;
        if let Some(error) = &self.error {
            write!(f, " - {}", excerpt(error))?;
        }
        if let Some(log_id) = &self.log_id {
            write!(f, " (log id {log_id})")?;
        }
        Ok(())
    }
}

/// Report of one install/update run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub steps: Vec<StepReport>,
    pub last_applied: Option<MigrationName>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, last_applied: Option<MigrationName>) -> Self {
        Self {
            run_id: run_id.into(),
            steps: Vec::new(),
            last_applied,
        }
    }

    pub fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    pub fn applied(&self) -> usize {
        self.count(Direction::Up, StepStatus::Ok)
    }

    pub fn reverted(&self) -> usize {
        self.count(Direction::Down, StepStatus::Ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.is_success())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Whether every step succeeded (an empty run counts as success)
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> String {
        if self.steps.is_empty() {
            return format!("Nothing to do, schema is up to date (run {})", self.run_id);
        }
        let mut line = format!(
            "{} applied, {} reverted, {} failed (run {})",
            self.applied(),
            self.reverted(),
            self.failed(),
            self.run_id
        );
        if !self.is_success() {
            line.push_str(" - partial success, failed migrations are retried on the next run");
        }
        line
    }

    fn count(&self, direction: Direction, status: StepStatus) -> usize {
        self.steps
            .iter()
            .filter(|s| s.direction == direction && s.status == status)
            .count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(f, "{step}")?;
        }
        write!(f, "{}", self.summary())
    }
}

/// Single-line excerpt of an error message, cut at [`EXCERPT_LEN`] characters.
pub fn excerpt(message: &str) -> String {
    let flat = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_LEN {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_LEN).collect();
        format!("{cut}...")
    }
}
