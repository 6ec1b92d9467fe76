//! Structured error side channel.
//!
//! Failed migrations are logged here after their transaction has been rolled
//! back. The returned correlation id is stored in the ledger's `log_id`
//! column so an operator can find the full error chain in the logs.

use std::error::Error;
use std::sync::Mutex;
use uuid::Uuid;

/// Log target used for migration failures
pub const ERROR_LOG_TARGET: &str = "qm::errors";

/// Records an error and returns a short correlation id for it.
pub trait ErrorLogger: Send + Sync {
    fn log_error(&self, context: &str, error: &dyn Error) -> String;
}

/// Generate an 8 character correlation id.
pub fn new_log_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Render an error followed by its `source()` chain.
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Default logger writing through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorLogger;

impl ErrorLogger for LogErrorLogger {
    fn log_error(&self, context: &str, error: &dyn Error) -> String {
        let log_id = new_log_id();
        log::error!(
            target: ERROR_LOG_TARGET,
            "[{log_id}] {context}: {}",
            error_chain(error)
        );
        log_id
    }
}

/// An error captured by [`MemoryErrorLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedError {
    pub log_id: String,
    pub context: String,
    pub message: String,
}

/// Logger keeping every error in memory; used by tests and embedders that
/// want to surface errors themselves.
#[derive(Debug, Default)]
pub struct MemoryErrorLogger {
    entries: Mutex<Vec<LoggedError>>,
}

impl MemoryErrorLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the errors logged so far
    pub fn entries(&self) -> Vec<LoggedError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl ErrorLogger for MemoryErrorLogger {
    fn log_error(&self, context: &str, error: &dyn Error) -> String {
        let log_id = new_log_id();
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LoggedError {
                log_id: log_id.clone(),
                context: context.to_string(),
                message: error_chain(error),
            });
        }
        log_id
    }
}
