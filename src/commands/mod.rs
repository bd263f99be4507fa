//! Run orchestration.
//!
//! Resolves settings, probes the formatter, discovers candidates, fans the
//! files out to the worker pool and folds the results into the report.


use crate::aggregate::{Aggregator, Report, Summary};
use crate::cli::Cli;
use crate::discover::{Discoverer, Discovery};
use crate::error::{ParfmtError, Result};
use crate::invoke::{Invoker, Mode, ProcessRunner, SystemRunner, Termination};
use crate::output::{HumanOptions, HumanReport, JsonReport, OutputFormat};
use crate::pool::{CancelToken, Dispatcher};
use crate::settings::Settings;
use std::io::{self, Write};
use std::time::Duration;

/// Upper bound for the `--version` probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for the `parfmt` command: real processes, real stdio.
pub fn cmd_format(cli: &Cli, cancel: &CancelToken) -> Result<Summary> {
    let cwd = std::env::current_dir()
        .map_err(|e| ParfmtError::UserError(format!("cannot determine current directory: {}", e)))?;
    let settings = Settings::load(cli, &cwd)?;
    run_with(&settings, &SystemRunner, cancel, io::stdout(), io::stderr())
}

/// Execute one run against injected process runner and output sinks.
pub fn run_with<O: Write, E: Write>(
    settings: &Settings,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    out: O,
    mut err: E,
) -> Result<Summary> {
    probe_formatter(settings, runner)?;

    let discoverer = Discoverer::new(&settings.extensions, &settings.exclude)
        .map_err(|e| ParfmtError::UserError(format!("invalid exclude pattern: {}", e)))?;
    let discovery = discoverer.discover(&settings.roots);

    tracing::info!(
        files = discovery.files.len(),
        discovery_errors = discovery.errors.len(),
        jobs = settings.jobs,
        "starting run"
    );

    let summary = match settings.output {
        OutputFormat::Human => {
            if settings.verbose {
                writeln!(err, "{}", banner(settings, discovery.files.len()))?;
            }
            let report = HumanReport::new(
                out,
                err,
                HumanOptions {
                    mode: settings.mode,
                    color: settings.color,
                    verbose: settings.verbose,
                    quiet: settings.quiet,
                },
            );
            execute(settings, runner, cancel, &discovery, report)?
        }
        OutputFormat::Json => execute(settings, runner, cancel, &discovery, JsonReport::new(out))?,
    };

    tracing::info!(
        total = summary.total,
        needs_formatting = summary.needs_formatting,
        errored = summary.errored,
        skipped = summary.skipped,
        "run finished"
    );
    Ok(summary)
}

fn execute<R: Report>(
    settings: &Settings,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    discovery: &Discovery,
    report: R,
) -> Result<Summary> {
    let files = &discovery.files;
    let mut aggregator = Aggregator::new(files, &settings.formatter, settings.mode, report);
    aggregator.discovery_errors(&discovery.errors);

    let dispatcher = Dispatcher::new(
        Invoker::new(runner),
        &settings.formatter,
        settings.mode,
        settings.jobs,
        cancel.clone(),
    );
    let stats = dispatcher.run(files, |index, result| aggregator.accept(index, result));

    let interrupted = stats.cancelled || cancel.is_cancelled();
    Ok(aggregator.finish(interrupted)?)
}

/// Verify the formatter can be launched before touching any file.
fn probe_formatter(settings: &Settings, runner: &dyn ProcessRunner) -> Result<()> {
    let command = settings.formatter.version_command();
    let unusable = |reason: String| {
        ParfmtError::UserError(format!(
            "unable to run formatter '{}': {}",
            settings.formatter.binary, reason
        ))
    };

    let output = runner
        .run(&command, Some(PROBE_TIMEOUT))
        .map_err(|e| unusable(e.to_string()))?;

    match output.termination {
        Termination::Exited(0) => {
            tracing::debug!(
                version = %String::from_utf8_lossy(&output.stdout).trim(),
                "formatter probe succeeded"
            );
            Ok(())
        }
        Termination::Exited(code) => Err(unusable(format!("'{}' exited with code {}", command, code))),
        Termination::Signaled(signal) => {
            Err(unusable(format!("'{}' terminated by signal {}", command, signal)))
        }
        Termination::TimedOut => Err(unusable(format!("'{}' timed out", command))),
    }
}

fn banner(settings: &Settings, files: usize) -> String {
    let action = match settings.mode {
        Mode::Check => "Checking",
        Mode::InPlace => "Formatting",
    };
    let noun = if files == 1 { "file" } else { "files" };
    let jobs = settings.jobs.min(files).max(1);
    format!(
        "{} {} {} with {} ({} {})",
        action,
        files,
        noun,
        settings.formatter.binary,
        jobs,
        if jobs == 1 { "job" } else { "jobs" }
    )
}
