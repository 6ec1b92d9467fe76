//! Migration planner: diffs repository against ledger.
//!
//! Planning is a pure function of the scanned migrations and the
//! authoritative ledger records; it never touches the database.

use qm_core::{Direction, LedgerRecord, Migration, MigrationName, MigrationState};
use std::collections::{BTreeMap, HashSet};

/// One operation of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Run the stored down-script of a migration gone from the repository
    Revert { record: LedgerRecord },

    /// Run a migration's up-script. `record` is the failed attempt being
    /// retried, whose ledger id is reused.
    Apply {
        migration: Migration,
        record: Option<LedgerRecord>,
    },
}

impl PlanStep {
    pub fn name(&self) -> &MigrationName {
        match self {
            PlanStep::Revert { record } => &record.migration_name,
            PlanStep::Apply { migration, .. } => &migration.name,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            PlanStep::Revert { .. } => Direction::Down,
            PlanStep::Apply { .. } => Direction::Up,
        }
    }
}

/// Ordered operations converging the ledger with the repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// All reverts, newest ledger entry first, then all applies by name
    pub steps: Vec<PlanStep>,

    /// Highest migration name that is applied once every step succeeds
    pub last_applied: Option<MigrationName>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn reverts(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.direction() == Direction::Down)
    }

    pub fn applies(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.direction() == Direction::Up)
    }
}

/// Compute the plan for `migrations` against the authoritative `records`.
///
/// - Frozen records are ignored entirely.
/// - Reverted records count as absent, so their migration is applied again
///   as a new ledger row if it reappears.
/// - A committed record (`Applied`, or `RevertFailed`) whose migration is
///   gone is reverted, most recently inserted first.
/// - A repository migration is applied when it has no record, or when its
///   last attempt failed (retry in place).
pub fn plan(migrations: &[Migration], records: &BTreeMap<MigrationName, LedgerRecord>) -> Plan {
    let available: HashSet<&MigrationName> = migrations.iter().map(|m| &m.name).collect();

    let mut reverts: Vec<&LedgerRecord> = records
        .values()
        .filter(|r| !available.contains(&r.migration_name))
        .filter(|r| {
            matches!(
                r.state(),
                MigrationState::Applied | MigrationState::RevertFailed
            )
        })
        .collect();
    reverts.sort_by(|a, b| b.id.cmp(&a.id).then_with(|| b.migration_name.cmp(&a.migration_name)));

    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    let mut applies = Vec::new();
    let mut last_applied = None;
    for migration in ordered {
        let existing = records.get(&migration.name);
        let step = match existing.map(LedgerRecord::state) {
            None | Some(MigrationState::Reverted) => Some(None),
            Some(MigrationState::AppliedFailed) | Some(MigrationState::Pending) => {
                Some(existing.cloned())
            }
            Some(MigrationState::Applied) | Some(MigrationState::RevertFailed) => None,
            Some(MigrationState::Frozen) => continue,
        };
        last_applied = Some(migration.name.clone());
        if let Some(record) = step {
            applies.push(PlanStep::Apply {
                migration: migration.clone(),
                record,
            });
        }
    }

    let mut steps: Vec<PlanStep> = reverts
        .into_iter()
        .map(|record| PlanStep::Revert {
            record: record.clone(),
        })
        .collect();
    steps.extend(applies);

    Plan {
        steps,
        last_applied,
    }
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
