//! Formatter invocation for a single file.
//!
//! Builds the formatter command line for one candidate, runs it through a
//! `ProcessRunner`, and classifies the outcome:
//! - check mode compares the formatter's output against the file and renders
//!   a unified diff when they differ (the file is never touched);
//! - in-place mode lets the formatter rewrite the file and only reports
//!   whether that succeeded and whether the content changed.
//!
//! "Needs formatting" is an expected outcome. A process that cannot be
//! started, is killed, times out, or exits with a code outside the
//! configured convention is an `InvocationError`.

mod runner;


pub use runner::{CommandLine, ProcessOutput, ProcessRunner, SystemRunner, Termination};

use crate::config::{CheckOutput, ExitClass, ExitCodeConvention};
use crate::diff::{self, DEFAULT_CONTEXT};
use crate::discover::CandidateFile;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Invocation mode for every job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report non-conformance without mutating files.
    Check,
    /// Rewrite files in place.
    InPlace,
}

/// Formatter command template shared by all jobs.
#[derive(Debug, Clone)]
pub struct Formatter {
    pub binary: String,
    pub args: Vec<String>,
    pub style: Option<String>,
    pub in_place_arg: String,
    pub check_output: CheckOutput,
    pub exit_codes: ExitCodeConvention,
    pub timeout: Option<Duration>,
}

impl Formatter {
    /// Formatter with default conventions for `binary`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            style: None,
            in_place_arg: crate::config::types::DEFAULT_IN_PLACE_ARG.to_string(),
            check_output: CheckOutput::default(),
            exit_codes: ExitCodeConvention::default(),
            timeout: None,
        }
    }

    /// `<binary> [args...] [--style=<style>] [-i] <file>`
    pub fn command_for(&self, file: &CandidateFile, mode: Mode) -> CommandLine {
        let mut command = CommandLine::new(&self.binary).args(&self.args);
        if let Some(style) = &self.style {
            command = command.arg(format!("--style={}", style));
        }
        if mode == Mode::InPlace {
            command = command.arg(&self.in_place_arg);
        }
        command.arg(file.path())
    }

    /// `<binary> --version`, used to verify the formatter is runnable.
    pub fn version_command(&self) -> CommandLine {
        CommandLine::new(&self.binary).arg("--version")
    }
}

/// The unit of work handed to a worker.
#[derive(Debug, Clone, Copy)]
pub struct JobSpec<'a> {
    /// Position of the file in discovery order.
    pub index: usize,
    pub file: &'a CandidateFile,
    pub mode: Mode,
    pub formatter: &'a Formatter,
}

/// A fault while invoking the formatter on one file.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed waiting for formatter: {0}")]
    Wait(#[source] std::io::Error),

    #[error("formatter exited with undocumented code {code}")]
    UnexpectedExit { code: i32 },

    #[error("terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("timed out after {seconds}s and was killed")]
    TimedOut { seconds: u64 },

    #[error("failed to read file: {0}")]
    ReadSource(#[source] std::io::Error),
}

/// What happened to one file.
#[derive(Debug)]
pub enum Outcome {
    /// Already conformant (check), or rewritten without changes (in-place).
    Clean,
    /// In-place mode changed the file.
    Reformatted,
    /// Check mode found differences; `diff` may be empty when only the exit
    /// code signalled non-conformance.
    NeedsFormatting { diff: String },
    /// The invocation itself failed.
    Failed(InvocationError),
    /// Never dispatched because the run was interrupted.
    Skipped,
}

/// Coarse status used for counting and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Clean,
    Reformatted,
    NeedsFormatting,
    Error,
    Skipped,
}

/// Outcome of running the formatter on one file. Immutable once produced.
#[derive(Debug)]
pub struct InvocationResult {
    pub file: CandidateFile,
    pub command: CommandLine,
    /// Process exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl InvocationResult {
    /// Result for a file that was never dispatched.
    pub fn skipped(file: CandidateFile, command: CommandLine) -> Self {
        Self {
            file,
            command,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
            outcome: Outcome::Skipped,
        }
    }

    pub fn status(&self) -> Status {
        match self.outcome {
            Outcome::Clean => Status::Clean,
            Outcome::Reformatted => Status::Reformatted,
            Outcome::NeedsFormatting { .. } => Status::NeedsFormatting,
            Outcome::Failed(_) => Status::Error,
            Outcome::Skipped => Status::Skipped,
        }
    }

    /// Clean for verdict purposes (in-place rewrites count as clean).
    pub fn is_clean(&self) -> bool {
        matches!(self.outcome, Outcome::Clean | Outcome::Reformatted)
    }

    pub fn diff(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::NeedsFormatting { diff } if !diff.is_empty() => Some(diff),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InvocationError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Runs one job at a time through the injected process runner.
#[derive(Clone, Copy)]
pub struct Invoker<'r> {
    runner: &'r dyn ProcessRunner,
}

impl<'r> Invoker<'r> {
    pub fn new(runner: &'r dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// Execute `job` and classify the result. Never panics or aborts on a
    /// per-file fault; every fault ends up in the returned `Outcome`.
    pub fn invoke(&self, job: &JobSpec<'_>) -> InvocationResult {
        let command = job.formatter.command_for(job.file, job.mode);
        tracing::debug!(index = job.index, command = %command, "invoking formatter");

        let result = match job.mode {
            Mode::Check => self.check(job, command),
            Mode::InPlace => self.rewrite(job, command),
        };

        tracing::debug!(
            index = job.index,
            status = ?result.status(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "formatter finished"
        );
        result
    }

    fn check(&self, job: &JobSpec<'_>, command: CommandLine) -> InvocationResult {
        let original = match std::fs::read(job.file.path()) {
            Ok(bytes) => bytes,
            Err(e) => return failed(job, command, InvocationError::ReadSource(e)),
        };

        let output = match self.runner.run(&command, job.formatter.timeout) {
            Ok(output) => output,
            Err(e) => return failed(job, command, e),
        };

        let stdout_text = String::from_utf8_lossy(&output.stdout).into_owned();
        let label = job.file.to_string();

        let outcome = classify(job.formatter, &output, |class| {
            let diff = match job.formatter.check_output {
                // Exit code alone reported the problem (e.g. `--dry-run -Werror`).
                CheckOutput::Formatted
                    if class == ExitClass::NeedsFormatting && output.stdout.is_empty() =>
                {
                    String::new()
                }
                CheckOutput::Formatted if output.stdout != original => diff::unified_diff(
                    &String::from_utf8_lossy(&original),
                    &stdout_text,
                    &label,
                    DEFAULT_CONTEXT,
                ),
                CheckOutput::Formatted => String::new(),
                CheckOutput::Diff => stdout_text.clone(),
            };
            if class == ExitClass::Clean && diff.is_empty() {
                Outcome::Clean
            } else {
                Outcome::NeedsFormatting { diff }
            }
        });

        finish(job, command, output, stdout_text, outcome)
    }

    fn rewrite(&self, job: &JobSpec<'_>, command: CommandLine) -> InvocationResult {
        let before = match std::fs::read(job.file.path()) {
            Ok(bytes) => bytes,
            Err(e) => return failed(job, command, InvocationError::ReadSource(e)),
        };

        let output = match self.runner.run(&command, job.formatter.timeout) {
            Ok(output) => output,
            Err(e) => return failed(job, command, e),
        };

        let outcome = classify(job.formatter, &output, |_| {
            match std::fs::read(job.file.path()) {
                Ok(after) if after == before => Outcome::Clean,
                Ok(_) => Outcome::Reformatted,
                Err(e) => Outcome::Failed(InvocationError::ReadSource(e)),
            }
        });

        let stdout_text = String::from_utf8_lossy(&output.stdout).into_owned();
        finish(job, command, output, stdout_text, outcome)
    }
}

/// Map a process termination to an outcome; `on_success` decides between
/// clean and needs-formatting once the exit code is known to be documented.
fn classify(
    formatter: &Formatter,
    output: &ProcessOutput,
    on_success: impl FnOnce(ExitClass) -> Outcome,
) -> Outcome {
    match output.termination {
        Termination::Exited(code) => match formatter.exit_codes.classify(code) {
            ExitClass::Unknown => Outcome::Failed(InvocationError::UnexpectedExit { code }),
            class => on_success(class),
        },
        Termination::Signaled(signal) => Outcome::Failed(InvocationError::Signaled { signal }),
        Termination::TimedOut => Outcome::Failed(InvocationError::TimedOut {
            seconds: formatter.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }),
    }
}

fn finish(
    job: &JobSpec<'_>,
    command: CommandLine,
    output: ProcessOutput,
    stdout: String,
    outcome: Outcome,
) -> InvocationResult {
    let exit_code = match output.termination {
        Termination::Exited(code) => Some(code),
        _ => None,
    };

    InvocationResult {
        file: job.file.clone(),
        command,
        exit_code,
        stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed: output.elapsed,
        outcome,
    }
}

fn failed(job: &JobSpec<'_>, command: CommandLine, error: InvocationError) -> InvocationResult {
    InvocationResult {
        file: job.file.clone(),
        command,
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::ZERO,
        outcome: Outcome::Failed(error),
    }
}
