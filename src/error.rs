//! Error types for the parfmt CLI.
//!
//! Uses thiserror for derive macros. `ParfmtError` covers faults that stop the
//! whole run before any file is processed; per-file and per-root faults live
//! next to the code that produces them (`invoke::InvocationError`,
//! `discover::DiscoveryError`) and never abort a run.

use crate::exit_codes;
use thiserror::Error;

/// Run-level error type.
#[derive(Error, Debug)]
pub enum ParfmtError {
    /// User provided invalid arguments or the environment is unusable.
    #[error("{0}")]
    UserError(String),

    /// Configuration file could not be read, parsed, or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Writing the report failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl ParfmtError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParfmtError::UserError(_) => exit_codes::USER_ERROR,
            ParfmtError::Config(_) => exit_codes::USER_ERROR,
            ParfmtError::Io(_) => exit_codes::FORMAT_FAILURE,
        }
    }
}

/// Result type alias for parfmt operations.
pub type Result<T> = std::result::Result<T, ParfmtError>;
