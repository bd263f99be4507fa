//! Fan-in of per-file results.
//!
//! The aggregator is the single consumer of the worker pool's result stream.
//! Results arrive in completion order; they are parked in a reorder buffer
//! keyed by discovery index and released to the report strictly in discovery
//! order, in a burst as soon as the next expected index shows up. Counters
//! are updated on release, so only this one owner ever mutates them.


use crate::discover::{CandidateFile, DiscoveryError};
use crate::exit_codes;
use crate::invoke::{Formatter, InvocationResult, Mode, Status};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;

/// Reduction of all results of a run.
///
/// `clean + needs_formatting + errored + skipped == total`; `reformatted`
/// is the subset of `clean` that in-place mode changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub clean: usize,
    pub reformatted: usize,
    pub needs_formatting: usize,
    pub errored: usize,
    pub skipped: usize,
    pub discovery_errors: usize,
    pub interrupted: bool,
}

impl Summary {
    fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Clean => self.clean += 1,
            Status::Reformatted => {
                self.clean += 1;
                self.reformatted += 1;
            }
            Status::NeedsFormatting => self.needs_formatting += 1,
            Status::Error => self.errored += 1,
            Status::Skipped => self.skipped += 1,
        }
    }

    /// True only if every file is clean and every root could be scanned.
    pub fn success(&self) -> bool {
        self.needs_formatting == 0
            && self.errored == 0
            && self.skipped == 0
            && self.discovery_errors == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            exit_codes::INTERRUPTED
        } else if self.success() {
            exit_codes::SUCCESS
        } else {
            exit_codes::FORMAT_FAILURE
        }
    }
}

/// Destination for the ordered report.
pub trait Report {
    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()>;

    /// Called once per file, in discovery order. `position` is 0-based.
    fn file(&mut self, position: usize, total: usize, result: &InvocationResult) -> io::Result<()>;

    fn finish(&mut self, summary: &Summary) -> io::Result<()>;
}

/// Ordered reduction of the result stream into a report and a `Summary`.
pub struct Aggregator<'a, R: Report> {
    files: &'a [CandidateFile],
    formatter: &'a Formatter,
    mode: Mode,
    pending: BTreeMap<usize, InvocationResult>,
    next: usize,
    summary: Summary,
    report: R,
    write_error: Option<io::Error>,
}

impl<'a, R: Report> Aggregator<'a, R> {
    pub fn new(files: &'a [CandidateFile], formatter: &'a Formatter, mode: Mode, report: R) -> Self {
        Self {
            files,
            formatter,
            mode,
            pending: BTreeMap::new(),
            next: 0,
            summary: Summary::default(),
            report,
            write_error: None,
        }
    }

    /// Report roots that could not be scanned. Call before any `accept`.
    pub fn discovery_errors(&mut self, errors: &[DiscoveryError]) {
        for error in errors {
            self.summary.discovery_errors += 1;
            let written = self.report.discovery_error(error);
            self.keep_write_error(written);
        }
    }

    /// Accept one tagged result in any order.
    ///
    /// Duplicate or out-of-range indices are ignored so the per-file
    /// invariant cannot be broken by a misbehaving producer.
    pub fn accept(&mut self, index: usize, result: InvocationResult) {
        if index >= self.files.len() || index < self.next || self.pending.contains_key(&index) {
            tracing::warn!(index, "ignoring unexpected result");
            return;
        }
        self.pending.insert(index, result);
        self.flush_ready();
    }

    /// Number of results parked waiting for a predecessor.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Account for every file that never produced a result, emit the
    /// remaining output and the trailing summary.
    pub fn finish(mut self, interrupted: bool) -> io::Result<Summary> {
        while self.next < self.files.len() {
            if !self.pending.contains_key(&self.next) {
                let file = self.files[self.next].clone();
                let command = self.formatter.command_for(&file, self.mode);
                self.pending
                    .insert(self.next, InvocationResult::skipped(file, command));
            }
            self.flush_ready();
        }

        self.summary.interrupted = interrupted;
        let written = self.report.finish(&self.summary);
        self.keep_write_error(written);

        match self.write_error {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }

    fn flush_ready(&mut self) {
        let total = self.files.len();
        while let Some(result) = self.pending.remove(&self.next) {
            self.summary.record(result.status());
            let written = self.report.file(self.next, total, &result);
            self.keep_write_error(written);
            self.next += 1;
        }
    }

    fn keep_write_error(&mut self, written: io::Result<()>) {
        if let Err(e) = written
            && self.write_error.is_none()
        {
            tracing::warn!(error = %e, "report output failed");
            self.write_error = Some(e);
        }
    }
}
