//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Quillmigrate - converge a SQL schema with versioned migration scripts
#[derive(Parser, Debug)]
#[command(name = "qm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger if needed and apply all pending migrations
    Install(RunArgs),

    /// Apply the difference between migration files and the ledger
    Update(RunArgs),

    /// Show the statement that removes the ledger (never run automatically)
    Uninstall,

    /// Show what install/update would do without changing the database
    Plan(ReportArgs),

    /// List ledger records and pending migrations
    Status(ReportArgs),
}

/// Arguments for install and update
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Exit non-zero when any migration failed
    #[arg(long)]
    pub fail_on_error: bool,
}

/// Arguments for read-only reporting commands
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// JSON document
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
