//! qm-core - Core library for Quillmigrate
//!
//! This crate provides configuration parsing, the migration value objects
//! shared by every other crate, migration file parsing, statement splitting,
//! and discovery of migration scripts on disk.

pub mod config;
pub mod error;
pub mod migration;
pub mod repository;
pub mod script;
pub mod splitter;

pub use config::{Config, DatabaseConfig, Engine, LedgerConfig};
pub use error::{CoreError, CoreResult};
pub use migration::{Direction, LedgerRecord, Migration, MigrationName, MigrationState};
pub use repository::MigrationRepository;
pub use script::{ScriptFormat, ScriptSections};
pub use splitter::{split_statements, strip_comments, SplitOptions};
