//! Error types and exit codes for mulch
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args)
//! - 3: Data error (invalid log, cyclic parents, integrity failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the mulch CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - invalid log, cyclic parents, integrity failure (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during mulch operations
#[derive(Error, Debug)]
pub enum MulchError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    // Data errors (exit code 3)
    #[error("log file not found: {path:?}")]
    LogNotFound { path: PathBuf },

    #[error("invalid log {path:?}: {reason}")]
    InvalidLog { path: PathBuf, reason: String },

    #[error("cyclic parent chain in {path:?} involving message {id}")]
    CyclicParents { path: PathBuf, id: String },

    #[error(
        "integrity failure in {path:?}: message {child} would survive while its parent {parent} is deleted"
    )]
    IntegrityFailure {
        path: PathBuf,
        child: String,
        parent: String,
    },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl MulchError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            MulchError::UsageError(_) => ExitCode::Usage,

            MulchError::LogNotFound { .. }
            | MulchError::InvalidLog { .. }
            | MulchError::CyclicParents { .. }
            | MulchError::IntegrityFailure { .. } => ExitCode::Data,

            MulchError::Io(_)
            | MulchError::Json(_)
            | MulchError::Toml(_)
            | MulchError::Other(_) => ExitCode::Failure,
        }
    }

    /// Convert error to JSON representation for structured error output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            MulchError::UsageError(_) => "usage_error",
            MulchError::LogNotFound { .. } => "log_not_found",
            MulchError::InvalidLog { .. } => "invalid_log",
            MulchError::CyclicParents { .. } => "cyclic_parents",
            MulchError::IntegrityFailure { .. } => "integrity_failure",
            MulchError::Io(_) => "io_error",
            MulchError::Json(_) => "json_error",
            MulchError::Toml(_) => "toml_error",
            MulchError::Other(_) => "other",
        }
    }
}

/// Result type alias for mulch operations
pub type Result<T> = std::result::Result<T, MulchError>;
