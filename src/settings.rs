//! Effective run settings.
//!
//! Merges command-line flags over the config file over built-in defaults,
//! once, at startup. Everything downstream reads `Settings` and never looks
//! at the CLI or config again.

use crate::cli::Cli;
use crate::config::Config;
use crate::config::types::DEFAULT_CONFIG_FILE;
use crate::error::{ParfmtError, Result};
use crate::invoke::{Formatter, Mode};
use crate::output::OutputFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub roots: Vec<PathBuf>,
    pub mode: Mode,
    /// Concrete pool size, at least 1.
    pub jobs: usize,
    pub formatter: Formatter,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub output: OutputFormat,
    pub color: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Settings {
    /// Load the config named by `--config` (or the default file in `cwd`,
    /// if present) and resolve it against the CLI.
    pub fn load(cli: &Cli, cwd: &Path) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(cwd.join(DEFAULT_CONFIG_FILE))?,
        };
        Self::resolve(cli, config)
    }

    /// Apply CLI overrides to `config`. CLI > config > defaults.
    pub fn resolve(cli: &Cli, config: Config) -> Result<Self> {
        let formatter_args = config.formatter_args()?;

        let binary = cli.formatter.clone().unwrap_or(config.formatter);
        if binary.trim().is_empty() {
            return Err(ParfmtError::UserError(
                "formatter must not be empty".to_string(),
            ));
        }

        let timeout_seconds = cli.timeout.or(config.timeout_seconds);
        if timeout_seconds == Some(0) {
            return Err(ParfmtError::UserError(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let mut formatter = Formatter::new(binary);
        formatter.args = formatter_args;
        formatter.style = cli.style.clone().or(config.style);
        formatter.in_place_arg = config.in_place_arg;
        formatter.check_output = config.check_output;
        formatter.exit_codes = config.exit_codes;
        formatter.timeout = timeout_seconds.map(Duration::from_secs);

        let extensions = if cli.extensions.is_empty() {
            config.extensions
        } else {
            cli.extensions.clone()
        };

        let mut exclude = config.exclude;
        exclude.extend(cli.exclude.iter().cloned());

        Ok(Self {
            roots: cli.paths.clone(),
            mode: if cli.in_place { Mode::InPlace } else { Mode::Check },
            jobs: resolve_jobs(cli.jobs.or(config.jobs)),
            formatter,
            extensions,
            exclude,
            output: cli.output,
            color: cli.color.enabled(),
            verbose: cli.verbose,
            quiet: cli.quiet,
        })
    }
}

/// `None` or 0 means one job per logical CPU.
pub fn resolve_jobs(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => num_cpus::get().max(1),
    }
}
