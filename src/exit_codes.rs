//! Exit code constants for the parfmt CLI.
//!
//! - 0: Every file is clean (or was rewritten successfully)
//! - 1: A file needs formatting, an invocation failed, or a root could not be scanned
//! - 2: User error (bad arguments, invalid config, formatter cannot be run)
//! - 130: Run interrupted by the operator

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// At least one file needs formatting or could not be processed.
pub const FORMAT_FAILURE: i32 = 1;

/// User error: bad arguments, invalid configuration, or unusable formatter.
pub const USER_ERROR: i32 = 2;

/// The run was interrupted (Ctrl-C) before all files were dispatched.
pub const INTERRUPTED: i32 = 130;
