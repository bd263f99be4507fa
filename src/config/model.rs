//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a parfmt run.
///
/// This struct represents the contents of `.parfmt.yaml`. Every field is
/// optional; command-line flags take precedence over anything set here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Formatter settings
    // =========================================================================
    /// Formatter binary name or path (default: "clang-format").
    #[serde(default = "default_formatter")]
    pub formatter: String,

    /// Extra arguments inserted before the file path, shell-quoted.
    #[serde(default)]
    pub formatter_args: String,

    /// Style passed as `--style=<style>`.
    #[serde(default)]
    pub style: Option<String>,

    /// Flag that makes the formatter rewrite the file (default: "-i").
    #[serde(default = "default_in_place_arg")]
    pub in_place_arg: String,

    /// Shape of the formatter's stdout in check mode.
    #[serde(default)]
    pub check_output: CheckOutput,

    /// How the formatter's exit codes are interpreted.
    #[serde(default)]
    pub exit_codes: ExitCodeConvention,

    // =========================================================================
    // Discovery settings
    // =========================================================================
    /// File extensions to format (no leading dots, case-insensitive).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns for files and directories to skip.
    #[serde(default)]
    pub exclude: Vec<String>,

    // =========================================================================
    // Execution settings
    // =========================================================================
    /// Number of formatter instances run in parallel (0 or unset: CPU count).
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Seconds after which a formatter process is killed.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formatter: default_formatter(),
            formatter_args: String::new(),
            style: None,
            in_place_arg: default_in_place_arg(),
            check_output: CheckOutput::default(),
            exit_codes: ExitCodeConvention::default(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            jobs: None,
            timeout_seconds: None,
        }
    }
}
