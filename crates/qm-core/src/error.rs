//! Error types for qm-core

use thiserror::Error;

/// Core error type for Quillmigrate
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Migration root directory not found
    #[error("[E004] Migration directory not found: {path}")]
    MigrationDirNotFound { path: String },

    /// E005: Migration file is missing the down-section marker
    #[error("[E005] Invalid migration format in '{path}': missing '{marker}' marker. Every migration must declare a down section, even an empty one.")]
    InvalidMigrationFormat { path: String, marker: String },

    /// E006: Migration file name does not yield a usable name
    #[error("[E006] Invalid migration file name: {path}")]
    InvalidMigrationName { path: String },

    /// E007: Two fragments of the same migration disagree
    #[error("[E007] Structural mismatch for migration '{name}' between '{first}' and '{second}': {reason}")]
    StructuralMismatch {
        name: String,
        first: String,
        second: String,
        reason: String,
    },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
