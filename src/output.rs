//! Report rendering.
//!
//! Supports `human` (default) and `json` outputs. Human output streams each
//! file as the aggregator releases it: diffs to stdout, formatter stderr and
//! failures to stderr, and a trailing summary line on stderr so stdout stays
//! a valid patch. JSON output collects everything and prints one document.

use crate::aggregate::{Report, Summary};
use crate::diff::diff_stat;
use crate::discover::DiscoveryError;
use crate::invoke::{InvocationResult, Mode, Outcome, Status};
use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Report format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// When to colorize human output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Resolve against the environment: `auto` colors only a terminal and
    /// honors `NO_COLOR`.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
            }
        }
    }
}

/// Human report presentation switches.
#[derive(Debug, Clone, Copy)]
pub struct HumanOptions {
    pub mode: Mode,
    pub color: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Streaming human-readable report.
pub struct HumanReport<O: Write, E: Write> {
    out: O,
    err: E,
    opts: HumanOptions,
}

impl<O: Write, E: Write> HumanReport<O, E> {
    pub fn new(out: O, err: E, opts: HumanOptions) -> Self {
        Self { out, err, opts }
    }

    fn error_prefix(&self) -> String {
        if self.opts.color {
            "error:".red().bold().to_string()
        } else {
            "error:".to_string()
        }
    }

    fn write_diff(&mut self, diff: &str) -> io::Result<()> {
        if !self.opts.color {
            return self.out.write_all(diff.as_bytes());
        }
        for line in diff.split_inclusive('\n') {
            let body = line.trim_end_matches('\n');
            let painted = if line.starts_with("+++") || line.starts_with("---") {
                body.bold().to_string()
            } else if line.starts_with("@@") {
                body.cyan().to_string()
            } else if line.starts_with('+') {
                body.green().to_string()
            } else if line.starts_with('-') {
                body.red().to_string()
            } else {
                body.to_string()
            };
            writeln!(self.out, "{}", painted)?;
        }
        Ok(())
    }

    fn write_progress(&mut self, position: usize, total: usize, result: &InvocationResult) -> io::Result<()> {
        let width = total.to_string().len();
        let progress = format!("[{:>width$}/{}]", position + 1, total, width = width);
        let runtime = format!("[{:.1}s]", result.elapsed.as_secs_f64());
        let detail = match self.opts.mode {
            Mode::InPlace => result.command.to_string(),
            Mode::Check => format!("{}: {}", result.file, status_label(result.status())),
        };
        writeln!(self.out, "{}{} {}", progress, runtime, detail)
    }
}

impl<O: Write, E: Write> Report for HumanReport<O, E> {
    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()> {
        let prefix = self.error_prefix();
        writeln!(self.err, "{} {}", prefix, error)
    }

    fn file(&mut self, position: usize, total: usize, result: &InvocationResult) -> io::Result<()> {
        if self.opts.verbose {
            self.write_progress(position, total, result)?;
        }

        match &result.outcome {
            Outcome::NeedsFormatting { diff } if !diff.is_empty() => self.write_diff(diff)?,
            Outcome::NeedsFormatting { .. } if !self.opts.verbose => {
                writeln!(self.out, "{}: needs formatting", result.file)?;
            }
            Outcome::Failed(error) => {
                let prefix = self.error_prefix();
                writeln!(self.err, "{} {}: {}", prefix, result.file, error)?;
            }
            _ => {}
        }

        if !result.stderr.is_empty() {
            self.err.write_all(result.stderr.as_bytes())?;
            if !result.stderr.ends_with('\n') {
                writeln!(self.err)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self, summary: &Summary) -> io::Result<()> {
        self.out.flush()?;
        if self.opts.quiet {
            return self.err.flush();
        }

        let line = summary_line(summary, self.opts.mode);
        if self.opts.color {
            writeln!(self.err, "{}", line.bold())?;
        } else {
            writeln!(self.err, "{}", line)?;
        }
        self.err.flush()
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Clean => "ok",
        Status::Reformatted => "reformatted",
        Status::NeedsFormatting => "needs formatting",
        Status::Error => "error",
        Status::Skipped => "skipped",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// One-line totals, e.g. `3 files checked: 1 clean, 1 need formatting, 1 failed`.
pub fn summary_line(summary: &Summary, mode: Mode) -> String {
    let mut line = match mode {
        Mode::Check => format!(
            "{} checked: {} clean, {} need formatting, {} failed",
            plural(summary.total, "file"),
            summary.clean,
            summary.needs_formatting,
            summary.errored
        ),
        Mode::InPlace => format!(
            "{} processed: {} reformatted, {} unchanged, {} failed",
            plural(summary.total, "file"),
            summary.reformatted,
            summary.clean - summary.reformatted,
            summary.errored
        ),
    };
    if summary.skipped > 0 {
        line.push_str(&format!(", {} skipped (interrupted)", summary.skipped));
    }
    if summary.discovery_errors > 0 {
        line.push_str(&format!(
            ", {} not scanned",
            plural(summary.discovery_errors, "path")
        ));
    }
    line
}

#[derive(Debug, Serialize)]
struct JsonFile {
    file: String,
    status: Status,
    exit_code: Option<i32>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    added: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    stderr: String,
}

#[derive(Debug, Serialize)]
struct JsonDiscoveryError {
    path: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct JsonDocument<'s> {
    results: &'s [JsonFile],
    discovery_errors: &'s [JsonDiscoveryError],
    summary: &'s Summary,
    success: bool,
}

/// Collects the whole run and prints one JSON document on finish.
pub struct JsonReport<O: Write> {
    out: O,
    results: Vec<JsonFile>,
    discovery_errors: Vec<JsonDiscoveryError>,
}

impl<O: Write> JsonReport<O> {
    pub fn new(out: O) -> Self {
        Self {
            out,
            results: Vec::new(),
            discovery_errors: Vec::new(),
        }
    }
}

impl<O: Write> Report for JsonReport<O> {
    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()> {
        self.discovery_errors.push(JsonDiscoveryError {
            path: error.path.display().to_string(),
            reason: error.reason.clone(),
        });
        Ok(())
    }

    fn file(&mut self, _position: usize, _total: usize, result: &InvocationResult) -> io::Result<()> {
        let diff = result.diff().map(str::to_string);
        let stat = diff.as_deref().map(diff_stat);
        self.results.push(JsonFile {
            file: result.file.to_string(),
            status: result.status(),
            exit_code: result.exit_code,
            elapsed_ms: result.elapsed.as_millis() as u64,
            added: stat.map(|s| s.added),
            removed: stat.map(|s| s.removed),
            diff,
            error: result.error().map(|e| e.to_string()),
            stderr: result.stderr.clone(),
        });
        Ok(())
    }

    fn finish(&mut self, summary: &Summary) -> io::Result<()> {
        let document = JsonDocument {
            results: &self.results,
            discovery_errors: &self.discovery_errors,
            summary,
            success: summary.success(),
        };
        serde_json::to_writer_pretty(&mut self.out, &document)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
