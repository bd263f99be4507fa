//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{ParfmtError, Result};
use globset::Glob;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(ParfmtError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ParfmtError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if the file exists, otherwise return defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| ParfmtError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `formatter` must be non-empty
    /// - `formatter_args` must split into shell words
    /// - `in_place_arg` must be non-empty
    /// - `extensions` entries must be non-empty
    /// - `exclude` entries must be valid globs
    /// - `timeout_seconds` must be positive when set
    /// - `exit_codes.clean` must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.formatter.trim().is_empty() {
            return Err(ParfmtError::Config(
                "config validation failed: formatter must not be empty".to_string(),
            ));
        }

        self.formatter_args()?;

        if self.in_place_arg.trim().is_empty() {
            return Err(ParfmtError::Config(
                "config validation failed: in_place_arg must not be empty".to_string(),
            ));
        }

        for ext in &self.extensions {
            if ext.trim().trim_start_matches('.').is_empty() {
                return Err(ParfmtError::Config(
                    "config validation failed: extensions entries must be non-empty".to_string(),
                ));
            }
        }

        for pattern in &self.exclude {
            Glob::new(pattern).map_err(|e| {
                ParfmtError::Config(format!(
                    "config validation failed: invalid exclude glob '{}': {}",
                    pattern, e
                ))
            })?;
        }

        if self.timeout_seconds == Some(0) {
            return Err(ParfmtError::Config(
                "config validation failed: timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.exit_codes.clean.is_empty() {
            return Err(ParfmtError::Config(
                "config validation failed: exit_codes.clean must list at least one code"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Split `formatter_args` into individual arguments.
    pub fn formatter_args(&self) -> Result<Vec<String>> {
        shell_words::split(&self.formatter_args).map_err(|e| {
            ParfmtError::Config(format!(
                "failed to parse formatter_args '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.formatter_args, e
            ))
        })
    }
}
