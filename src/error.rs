//! Error types for tally.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ruleset not found: {0}")]
    RulesetNotFound(PathBuf),

    #[error("Ruleset parse error: {0}")]
    RulesetParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Home directory not found")]
    HomeDirNotFound,
}

impl Error {
    /// Whether this error invalidates the whole run (a ruleset defect),
    /// as opposed to an ordinary I/O failure.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::RulesetNotFound(_) | Error::RulesetParse(_) | Error::Config(_)
        )
    }
}

/// Process exit codes understood by pre-commit/CI harnesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every reference agrees with its canonical fact.
    Pass = 0,
    /// At least one mismatch or extraction failure.
    Inconsistent = 1,
    /// The ruleset itself is broken; no report was produced.
    ConfigError = 2,
}
