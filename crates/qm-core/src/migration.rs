//! Migration value objects: the transient [`Migration`] discovered on disk and
//! the persistent [`LedgerRecord`] stored in the target schema.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;

/// Strongly-typed migration name, derived from the script's file name.
///
/// Ordering between migrations is the lexicographic ordering of this name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationName(String);

impl MigrationName {
    /// Try to create a new `MigrationName`, returning `None` if the name is
    /// empty or only whitespace.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.trim().is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Create a new `MigrationName`, panicking in debug builds if the name is empty.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(!s.trim().is_empty(), "MigrationName must not be empty");
        Self(s)
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for MigrationName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MigrationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MigrationName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for MigrationName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Direction a migration script runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply the up-section
    Up,
    /// Revert using the down-section
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Lifecycle state of a migration name across runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Never attempted
    Pending,
    /// Up-script committed
    Applied,
    /// Up-script failed and was rolled back; retried on the next run
    AppliedFailed,
    /// Down-script committed
    Reverted,
    /// Down-script failed or was missing
    RevertFailed,
    /// Excluded from planning by the skip flag
    Frozen,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Applied => "applied",
            MigrationState::AppliedFailed => "applied_failed",
            MigrationState::Reverted => "reverted",
            MigrationState::RevertFailed => "revert_failed",
            MigrationState::Frozen => "frozen",
        };
        f.write_str(s)
    }
}

/// A migration unit discovered on disk. Rebuilt from the repository on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Unique name, the file stem
    pub name: MigrationName,

    /// SQL applied on install/update
    pub up_script: String,

    /// SQL applied when the migration disappears from the repository.
    /// Empty when the author declared the migration irreversible.
    pub down_script: String,

    /// File the migration was read from
    pub source: PathBuf,

    /// SHA-256 of the raw file content
    pub checksum: String,
}

impl Migration {
    /// Build a migration from its parsed sections.
    pub fn new(
        name: MigrationName,
        up_script: impl Into<String>,
        down_script: impl Into<String>,
        source: PathBuf,
        raw_content: &str,
    ) -> Self {
        Self {
            name,
            up_script: up_script.into(),
            down_script: down_script.into(),
            source,
            checksum: compute_checksum(raw_content),
        }
    }

    /// Whether the author supplied a non-empty down-section
    pub fn has_down_script(&self) -> bool {
        !self.down_script.trim().is_empty()
    }
}

/// One row of the migration ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Ledger-assigned id; `None` until first inserted
    pub id: Option<i64>,
    pub migration_name: MigrationName,
    pub up_datetime: Option<NaiveDateTime>,
    pub up_script: String,
    pub up_result: Option<String>,
    pub down_datetime: Option<NaiveDateTime>,
    pub down_script: String,
    pub down_result: Option<String>,
    pub failed_flag: bool,
    pub failed_message: Option<String>,
    pub skip_flag: bool,
    /// Correlation id into the structured error log
    pub log_id: Option<String>,
}

impl LedgerRecord {
    /// Fresh, not yet persisted record for a migration's first attempt.
    pub fn for_migration(migration: &Migration) -> Self {
        Self {
            id: None,
            migration_name: migration.name.clone(),
            up_datetime: None,
            up_script: migration.up_script.clone(),
            up_result: None,
            down_datetime: None,
            down_script: migration.down_script.clone(),
            down_result: None,
            failed_flag: false,
            failed_message: None,
            skip_flag: false,
            log_id: None,
        }
    }

    /// Derive the lifecycle state from the stored columns.
    pub fn state(&self) -> MigrationState {
        if self.skip_flag {
            MigrationState::Frozen
        } else if self.down_datetime.is_some() {
            if self.failed_flag {
                MigrationState::RevertFailed
            } else {
                MigrationState::Reverted
            }
        } else if self.up_datetime.is_some() {
            if self.failed_flag {
                MigrationState::AppliedFailed
            } else {
                MigrationState::Applied
            }
        } else {
            MigrationState::Pending
        }
    }
}

/// Compute the SHA-256 hex digest of a script
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
