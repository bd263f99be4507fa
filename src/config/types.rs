//! Configuration types and defaults for parfmt.
//!
//! This module defines the exit-code convention of the wrapped formatter and
//! the default value functions used by the Config struct.

use serde::{Deserialize, Serialize};

/// Default formatter binary, looked up in `$PATH`.
pub const DEFAULT_FORMATTER: &str = "clang-format";

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".parfmt.yaml";

/// How the formatter's exit codes map onto outcomes.
///
/// Codes in neither list are treated as invocation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitCodeConvention {
    /// Exit codes meaning the formatter ran normally; the output decides
    /// whether the file is clean.
    pub clean: Vec<i32>,

    /// Exit codes meaning the formatter itself reports the file as
    /// non-conformant (e.g. `clang-format --dry-run -Werror`).
    pub needs_formatting: Vec<i32>,
}

impl Default for ExitCodeConvention {
    fn default() -> Self {
        Self {
            clean: vec![0],
            needs_formatting: Vec::new(),
        }
    }
}

/// Classification of a formatter exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Clean,
    NeedsFormatting,
    Unknown,
}

impl ExitCodeConvention {
    /// Classify an exit code. `clean` wins if a code appears in both lists.
    pub fn classify(&self, code: i32) -> ExitClass {
        if self.clean.contains(&code) {
            ExitClass::Clean
        } else if self.needs_formatting.contains(&code) {
            ExitClass::NeedsFormatting
        } else {
            ExitClass::Unknown
        }
    }
}

/// What the formatter writes to stdout in check mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutput {
    /// The full formatted file (clang-format style); parfmt computes the diff.
    #[default]
    Formatted,
    /// A ready-made diff; empty output means the file is clean.
    Diff,
}

/// Default flag that switches the formatter to in-place rewriting.
pub const DEFAULT_IN_PLACE_ARG: &str = "-i";

pub(super) fn default_in_place_arg() -> String {
    DEFAULT_IN_PLACE_ARG.to_string()
}

pub(super) fn default_formatter() -> String {
    DEFAULT_FORMATTER.to_string()
}

/// Default file extensions (no leading dots) considered source files.
pub fn default_extensions() -> Vec<String> {
    ["c", "h", "cpp", "hpp", "cc", "hh", "cxx", "hxx", "c++", "h++", "m", "mm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
