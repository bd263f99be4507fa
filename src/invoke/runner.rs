//! External process execution.
//!
//! `ProcessRunner` is the seam between the invoker and the operating system:
//! the real `SystemRunner` spawns the formatter, while tests substitute an
//! in-memory fake that never starts a process.

use super::InvocationError;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Interval between `try_wait` polls while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for the output pipes to close after a timeout kill.
/// Descendants of the killed process may hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        write!(f, "{}", shell_words::join(words))
    }
}

/// How a finished process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

/// Captured result of one process run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

/// Capability to run a command to completion and capture its streams.
///
/// Implementations are shared by all workers, hence `Sync`.
pub trait ProcessRunner: Sync {
    /// Run `command`, killing it once `timeout` elapses.
    ///
    /// Returns `Err` only when the process could not be started or waited
    /// on; a non-zero exit or a timeout is reported through `Termination`.
    fn run(
        &self,
        command: &CommandLine,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, InvocationError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        command: &CommandLine,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, InvocationError> {
        let start = Instant::now();
        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group: a terminal Ctrl-C reaches parfmt only, and
        // running jobs are left to finish.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            process.process_group(0);
        }

        let mut child = process
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty process never blocks on a
        // full pipe while we wait for it.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let waited = match timeout {
            Some(limit) => wait_with_timeout(&mut child, limit),
            None => child.wait().map(termination),
        };

        let termination = waited.map_err(InvocationError::Wait)?;
        let grace = (termination == Termination::TimedOut).then_some(DRAIN_GRACE);
        let stdout = collect_reader(stdout, grace);
        let stderr = collect_reader(stderr, grace);

        Ok(ProcessOutput {
            termination,
            stdout,
            stderr,
            elapsed: start.elapsed(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Collect a reader's output. With a `grace` limit, a reader still blocked
/// after it is abandoned and whatever it buffered is dropped.
fn collect_reader(reader: Option<Receiver<Vec<u8>>>, grace: Option<Duration>) -> Vec<u8> {
    let Some(rx) = reader else {
        return Vec::new();
    };
    match grace {
        None => rx.recv().unwrap_or_default(),
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(buf) => buf,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("output pipe still open after kill; abandoning reader");
                Vec::new()
            }
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
        },
    }
}

/// Wait for a child process, killing it when `timeout` elapses.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Termination> {
    let start = Instant::now();

    loop {
        match child.try_wait()? {
            Some(status) => return Ok(termination(status)),
            None => {
                if start.elapsed() >= timeout {
                    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(Termination::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn termination(status: ExitStatus) -> Termination {
    if let Some(code) = status.code() {
        return Termination::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Termination::Signaled(signal);
        }
    }

    Termination::Exited(-1)
}
