//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use qm_engine::RunReport;
use serde::Serialize;
use std::fmt;

use crate::cli::{OutputFormat, RunArgs};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Print a value as pretty JSON
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Print an install/update report and map failures to an exit code.
pub(crate) fn finish_run(report: &RunReport, args: &RunArgs) -> Result<()> {
    match args.output {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Text => println!("{report}"),
    }

    if args.fail_on_error && !report.is_success() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}
