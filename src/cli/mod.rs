//! CLI argument parsing for parfmt.
//!
//! Uses clap derive macros for declarative argument definitions. Values
//! given here override the config file; unset options fall back to it
//! (see `settings`).

use crate::output::{ColorChoice, OutputFormat};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Parfmt: run clang-format over a source tree in parallel.
///
/// Without `--in-place`, prints a unified diff for every file that is not
/// formatted and exits non-zero. With `--in-place`, rewrites files.
#[derive(Parser, Debug)]
#[command(name = "parfmt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to format.
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Rewrite files instead of reporting differences.
    #[arg(short = 'i', long)]
    pub in_place: bool,

    /// Number of formatter instances to run in parallel (0: CPU count).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Formatter binary name or path.
    #[arg(long, value_name = "PATH")]
    pub formatter: Option<String>,

    /// Formatting style, passed as `--style=<STYLE>`.
    #[arg(long)]
    pub style: Option<String>,

    /// Comma-separated file extensions, replacing the default set.
    #[arg(short, long, value_delimiter = ',', value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob of files or directories to skip (repeatable).
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Kill a formatter process after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Config file (default: .parfmt.yaml in the current directory, if present).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    /// When to use colors in human output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print one status line per file and enable debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress the trailing summary line.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["parfmt"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
        assert!(!cli.in_place);
        assert!(cli.jobs.is_none());
        assert!(cli.formatter.is_none());
        assert!(cli.extensions.is_empty());
        assert!(cli.exclude.is_empty());
        assert_eq!(cli.output, OutputFormat::Human);
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn parse_in_place_with_jobs() {
        let cli = Cli::try_parse_from(["parfmt", "-i", "-j", "4", "src", "include"]).unwrap();
        assert!(cli.in_place);
        assert_eq!(cli.jobs, Some(4));
        assert_eq!(
            cli.paths,
            vec![PathBuf::from("src"), PathBuf::from("include")]
        );
    }

    #[test]
    fn parse_extensions_are_comma_separated() {
        let cli = Cli::try_parse_from(["parfmt", "-e", "c,h", "--extensions", "cpp"]).unwrap();
        assert_eq!(cli.extensions, vec!["c", "h", "cpp"]);
    }

    #[test]
    fn parse_exclude_is_repeatable() {
        let cli = Cli::try_parse_from([
            "parfmt",
            "-x",
            "third_party",
            "--exclude",
            "*.pb.h",
        ])
        .unwrap();
        assert_eq!(cli.exclude, vec!["third_party", "*.pb.h"]);
    }

    #[test]
    fn parse_formatter_options() {
        let cli = Cli::try_parse_from([
            "parfmt",
            "--formatter",
            "/opt/llvm/bin/clang-format",
            "--style",
            "file",
            "--timeout",
            "30",
            "--config",
            "ci/parfmt.yaml",
        ])
        .unwrap();
        assert_eq!(cli.formatter.as_deref(), Some("/opt/llvm/bin/clang-format"));
        assert_eq!(cli.style.as_deref(), Some("file"));
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.config, Some(PathBuf::from("ci/parfmt.yaml")));
    }

    #[test]
    fn parse_output_and_color() {
        let cli =
            Cli::try_parse_from(["parfmt", "--output", "json", "--color", "never"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_rejects_verbose_with_quiet() {
        assert!(Cli::try_parse_from(["parfmt", "-v", "-q"]).is_err());
    }

    #[test]
    fn parse_rejects_negative_jobs() {
        assert!(Cli::try_parse_from(["parfmt", "-j", "-1"]).is_err());
    }
}
