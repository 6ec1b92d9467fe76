//! qm-engine - Migration engine for Quillmigrate
//!
//! Converges a target schema with a repository of versioned migration
//! scripts: the ledger records what ran, the planner diffs repository and
//! ledger into reverts and applies, the executor runs each script in its own
//! transaction, and [`Migrator`] wires them together.

pub mod context;
pub mod error;
pub mod error_logger;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod planner;
pub mod report;

#[cfg(test)]
pub(crate) mod test_utils;

pub use context::RunContext;
pub use error::{EngineError, EngineResult};
pub use error_logger::{ErrorLogger, LogErrorLogger, MemoryErrorLogger};
pub use orchestrator::{uninstall_unsupported, Migrator, StatusEntry};
pub use planner::{plan, Plan, PlanStep};
pub use report::{RunReport, StepReport, StepStatus};
