//! Configuration types and parsing for quillmigrate.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main project configuration from quillmigrate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Application name
    pub name: String,

    /// Directories containing migration scripts.
    ///
    /// More than one entry makes this a multi-source application: all roots
    /// are merged into a single migration set before planning.
    #[serde(default = "default_migration_paths")]
    pub migration_paths: Vec<String>,

    /// File extension of migration scripts (without the dot)
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Migration ledger settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Database engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// MySQL / MariaDB
    MySql,
    /// PostgreSQL
    Postgres,
    /// Microsoft SQL Server
    MsSql,
    /// DuckDB (default, bundled driver)
    #[default]
    DuckDb,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::MySql => write!(f, "mysql"),
            Engine::Postgres => write!(f, "postgres"),
            Engine::MsSql => write!(f, "mssql"),
            Engine::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Engine family of the target database
    #[serde(default)]
    pub engine: Engine,

    /// Database path or connection string (`:memory:` for in-memory DuckDB)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            path: default_db_path(),
        }
    }
}

/// Ledger table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Name of the tracking table in the target schema
    #[serde(default = "default_ledger_table")]
    pub table: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: default_ledger_table(),
        }
    }
}

const DEFAULT_DB_PATH: &str = ":memory:";

/// Default name of the ledger table
pub const DEFAULT_LEDGER_TABLE: &str = "_migrations";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_migration_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

fn default_file_extension() -> String {
    "sql".to_string()
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for quillmigrate.yml or quillmigrate.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("quillmigrate.yml");
        let yaml_path = dir.join("quillmigrate.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: dir.join("quillmigrate.yml").display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Application name cannot be empty".to_string(),
            });
        }

        if self.migration_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one migration_paths entry must be specified".to_string(),
            });
        }

        if self.file_extension.is_empty() || self.file_extension.starts_with('.') {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "file_extension must be a bare extension like 'sql', got '{}'",
                    self.file_extension
                ),
            });
        }

        if !is_valid_table_name(&self.ledger.table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "Ledger table name '{}' must contain only letters, digits and underscores",
                    self.ledger.table
                ),
            });
        }

        Ok(())
    }

    /// Get absolute migration roots relative to a project root
    pub fn migration_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        self.targets.keys().map(|s| s.as_str()).collect()
    }

    /// Get database configuration, optionally applying target overrides
    ///
    /// If target is specified and exists, uses target's database config.
    /// Otherwise, uses the base database config.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve target from CLI flag or QM_TARGET environment variable
    ///
    /// Priority: CLI flag > QM_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var("QM_TARGET").ok())
    }
}

fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
