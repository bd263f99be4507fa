use crate::invoke::{
    CommandLine, InvocationError, ProcessOutput, ProcessRunner, Termination,
};
use crate::pool::CancelToken;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Formatting rule of the fake formatters: leading indentation is removed.
pub(crate) fn dedent(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| line.trim_start_matches([' ', '\t']))
        .collect()
}

/// Injected misbehavior for a specific file name.
#[derive(Debug, Clone)]
pub(crate) enum FakeFailure {
    Exit { code: i32, stderr: String },
    Spawn,
    Signal(i32),
    Timeout,
}

/// In-memory stand-in for clang-format.
///
/// Check mode prints the dedented file; in-place mode (`-i`) rewrites it.
/// Tracks how many invocations overlap so tests can assert pool bounds.
#[derive(Default)]
pub(crate) struct FakeFormatter {
    delay: Duration,
    jitter: bool,
    failures: HashMap<String, FakeFailure>,
    cancel_after: Option<(usize, CancelToken)>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeFormatter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every invocation.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Vary the delay per file so completion order differs from discovery order.
    pub(crate) fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub(crate) fn failing(mut self, file_name: &str, failure: FakeFailure) -> Self {
        self.failures.insert(file_name.to_string(), failure);
        self
    }

    /// Trigger `token` once `calls` invocations have started.
    pub(crate) fn cancel_after(mut self, calls: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn delay_for(&self, path: &Path) -> Duration {
        if !self.jitter {
            return self.delay;
        }
        let seed: usize = path.to_string_lossy().bytes().map(usize::from).sum();
        self.delay * ((seed % 5) as u32 + 1)
    }

    fn format(&self, command: &CommandLine) -> Result<ProcessOutput, InvocationError> {
        if command.args.iter().any(|a| a == "--version") {
            return Ok(output(Termination::Exited(0), b"fake-format 1.0\n".to_vec(), Vec::new()));
        }

        let path = command
            .args
            .last()
            .map(PathBuf::from)
            .unwrap_or_default();
        let in_place = command.args.iter().any(|a| a == "-i");

        self.seen
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(path.clone());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(failure) = self.failures.get(&name) {
            return match failure {
                FakeFailure::Exit { code, stderr } => Ok(output(
                    Termination::Exited(*code),
                    Vec::new(),
                    stderr.clone().into_bytes(),
                )),
                FakeFailure::Spawn => Err(InvocationError::Spawn {
                    program: command.program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
                FakeFailure::Signal(sig) => {
                    Ok(output(Termination::Signaled(*sig), Vec::new(), Vec::new()))
                }
                FakeFailure::Timeout => {
                    Ok(output(Termination::TimedOut, Vec::new(), Vec::new()))
                }
            };
        }

        let text = std::fs::read_to_string(&path).map_err(InvocationError::Wait)?;
        let formatted = dedent(&text);
        if in_place {
            std::fs::write(&path, &formatted).map_err(InvocationError::Wait)?;
            Ok(output(Termination::Exited(0), Vec::new(), Vec::new()))
        } else {
            Ok(output(Termination::Exited(0), formatted.into_bytes(), Vec::new()))
        }
    }
}

impl ProcessRunner for FakeFormatter {
    fn run(
        &self,
        command: &CommandLine,
        _timeout: Option<Duration>,
    ) -> Result<ProcessOutput, InvocationError> {
        let started = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after
            && started >= *after
        {
            token.cancel();
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = command
            .args
            .last()
            .map(|p| self.delay_for(Path::new(p)))
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let result = self.format(command);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn output(termination: Termination, stdout: Vec<u8>, stderr: Vec<u8>) -> ProcessOutput {
    ProcessOutput {
        termination,
        stdout,
        stderr,
        elapsed: Duration::from_millis(1),
    }
}

/// Create a temp directory populated with `files` (relative path, content).
pub(crate) fn create_tree(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = temp_dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    temp_dir
}

/// The three-file tree used by the end-to-end scenarios: one conformant C
/// file, one with two indented lines, and a header meant to be excluded.
pub(crate) fn scenario_tree() -> TempDir {
    create_tree(&[
        ("a.c", "int main() {\nreturn 0;\n}\n"),
        ("b.c", "int f() {\n    int x = 1;\n    return x;\n}\n"),
        ("nofile.h", "  int g();\n"),
    ])
}

/// Write an executable shell script that behaves like the fake formatter.
#[cfg(unix)]
pub(crate) fn write_formatter_script(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
inplace=0
file=""
for arg in "$@"; do
  case "$arg" in
    --version) echo "fake-format 1.0"; exit 0 ;;
    -i) inplace=1 ;;
    -*) ;;
    *) file="$arg" ;;
  esac
done
if [ "$inplace" = 1 ]; then
  formatted=$(sed 's/^[[:space:]]*//' "$file"; printf x)
  printf '%s' "${formatted%x}" > "$file"
else
  sed 's/^[[:space:]]*//' "$file"
fi
"#;
    let path = dir.join("fake-format");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
