//! Bounded streaming worker pool.
//!
//! Workers pull one job at a time from a zero-capacity channel, so a slot is
//! refilled the moment its previous job finishes and no more than `jobs`
//! invocations are ever in flight. Results flow back over a second channel
//! tagged with their discovery index; the caller consumes them as they
//! arrive, in completion order.
//!
//! With a single job slot everything runs on the calling thread in
//! discovery order.

use crate::discover::CandidateFile;
use crate::invoke::{Formatter, InvocationResult, Invoker, JobSpec, Mode};
use crossbeam_channel::{bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Shared flag that stops dispatching new jobs once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counts reported by a finished dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Jobs handed to a worker.
    pub dispatched: usize,
    /// Whether dispatch stopped early because of cancellation.
    pub cancelled: bool,
}

/// Feeds candidate files to a fixed number of workers.
pub struct Dispatcher<'a> {
    invoker: Invoker<'a>,
    formatter: &'a Formatter,
    mode: Mode,
    jobs: usize,
    cancel: CancelToken,
}

impl<'a> Dispatcher<'a> {
    /// `jobs` is the resolved pool size; values below 1 are treated as 1.
    pub fn new(
        invoker: Invoker<'a>,
        formatter: &'a Formatter,
        mode: Mode,
        jobs: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            invoker,
            formatter,
            mode,
            jobs: jobs.max(1),
            cancel,
        }
    }

    /// Run every file through the invoker, calling `on_result` with each
    /// `(index, result)` as soon as it is available.
    ///
    /// `on_result` always runs on the calling thread. Files not dispatched
    /// because of cancellation produce no callback; the aggregator accounts
    /// for them.
    pub fn run<F>(&self, files: &[CandidateFile], mut on_result: F) -> DispatchStats
    where
        F: FnMut(usize, InvocationResult),
    {
        let workers = self.jobs.min(files.len());
        if workers <= 1 {
            return self.run_sequential(files, &mut on_result);
        }

        tracing::debug!(workers, files = files.len(), "starting worker pool");

        let (job_tx, job_rx) = bounded::<usize>(0);
        let (result_tx, result_rx) = unbounded::<(usize, InvocationResult)>();

        thread::scope(|scope| {
            for worker_idx in 0..workers {
                let rx = job_rx.clone();
                let tx = result_tx.clone();
                let invoker = self.invoker;
                let builder = thread::Builder::new().name(format!("parfmt-worker-{worker_idx}"));
                let spawned = builder.spawn_scoped(scope, move || {
                    for index in rx.iter() {
                        let job = self.job(index, &files[index]);
                        if tx.send((index, invoker.invoke(&job))).is_err() {
                            break;
                        }
                    }
                });
                if let Err(e) = spawned {
                    // Remaining workers still drain the queue.
                    tracing::warn!(worker = worker_idx, error = %e, "failed to spawn worker");
                }
            }

            // Drop our clones so channel disconnection is driven by worker exits.
            drop(job_rx);
            drop(result_tx);

            let cancel = self.cancel.clone();
            let feeder = scope.spawn(move || {
                let mut stats = DispatchStats::default();
                for index in 0..files.len() {
                    if cancel.is_cancelled() {
                        stats.cancelled = true;
                        break;
                    }
                    // Rendezvous: blocks until a worker is idle.
                    if job_tx.send(index).is_err() {
                        break;
                    }
                    stats.dispatched += 1;
                }
                stats
            });

            for (index, result) in result_rx.iter() {
                on_result(index, result);
            }

            let stats = feeder.join().unwrap_or_default();
            if stats.cancelled {
                tracing::warn!(
                    dispatched = stats.dispatched,
                    total = files.len(),
                    "interrupted; stopped dispatching"
                );
            }
            stats
        })
    }

    fn run_sequential<F>(&self, files: &[CandidateFile], on_result: &mut F) -> DispatchStats
    where
        F: FnMut(usize, InvocationResult),
    {
        let mut stats = DispatchStats::default();
        for (index, file) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                tracing::warn!(
                    dispatched = stats.dispatched,
                    total = files.len(),
                    "interrupted; stopped dispatching"
                );
                break;
            }
            stats.dispatched += 1;
            let result = self.invoker.invoke(&self.job(index, file));
            on_result(index, result);
        }
        stats
    }

    fn job<'f>(&'f self, index: usize, file: &'f CandidateFile) -> JobSpec<'f> {
        JobSpec {
            index,
            file,
            mode: self.mode,
            formatter: self.formatter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeFormatter, create_tree};
    use std::collections::HashSet;
    use std::time::Duration;

    fn files_in(tree: &tempfile::TempDir, count: usize) -> Vec<CandidateFile> {
        (0..count)
            .map(|i| {
                let path = tree.path().join(format!("f{:02}.c", i));
                std::fs::write(&path, format!("  int v{};\n", i)).unwrap();
                CandidateFile::new(path)
            })
            .collect()
    }

    fn collect(dispatcher: &Dispatcher<'_>, files: &[CandidateFile]) -> Vec<(usize, InvocationResult)> {
        let mut results = Vec::new();
        dispatcher.run(files, |index, result| results.push((index, result)));
        results
    }

    #[test]
    fn test_every_file_yields_exactly_one_result() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 25);
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new().with_jitter();
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            4,
            CancelToken::new(),
        );

        let results = collect(&dispatcher, &files);

        assert_eq!(results.len(), files.len());
        let indices: HashSet<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices.len(), files.len());
        for (index, result) in &results {
            assert_eq!(result.file, files[*index]);
        }
    }

    #[test]
    fn test_concurrency_never_exceeds_pool_size() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 12);
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new().with_delay(Duration::from_millis(20));
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            3,
            CancelToken::new(),
        );

        let stats = dispatcher.run(&files, |_, _| {});

        assert_eq!(stats.dispatched, 12);
        assert!(!stats.cancelled);
        assert!(runner.peak_concurrency() <= 3);
        assert!(runner.peak_concurrency() >= 2, "pool never ran in parallel");
    }

    #[test]
    fn test_single_job_runs_sequentially_in_order() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 6);
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new().with_delay(Duration::from_millis(2));
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            1,
            CancelToken::new(),
        );

        let results = collect(&dispatcher, &files);

        assert_eq!(runner.peak_concurrency(), 1);
        let order: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
        let seen: Vec<_> = runner.seen();
        let expected: Vec<_> = files.iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_cancel_before_start_dispatches_nothing() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 5);
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        for jobs in [1, 4] {
            let dispatcher = Dispatcher::new(
                Invoker::new(&runner),
                &formatter,
                Mode::Check,
                jobs,
                cancel.clone(),
            );
            let stats = dispatcher.run(&files, |_, _| panic!("nothing should run"));
            assert_eq!(stats.dispatched, 0);
            assert!(stats.cancelled);
        }
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn test_cancel_mid_run_stops_dispatch_and_keeps_finished_results() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 20);
        let formatter = Formatter::new("fake");
        let cancel = CancelToken::new();
        let runner = FakeFormatter::new()
            .with_delay(Duration::from_millis(10))
            .cancel_after(2, cancel.clone());
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            2,
            cancel,
        );

        let results = collect(&dispatcher, &files);
        let stats_dispatched = results.len();

        assert!(stats_dispatched < files.len());
        assert!(stats_dispatched >= 2);
        assert_eq!(runner.calls(), stats_dispatched);
    }

    #[test]
    fn test_pool_larger_than_file_count() {
        let tree = create_tree(&[]);
        let files = files_in(&tree, 2);
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new();
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            64,
            CancelToken::new(),
        );

        assert_eq!(collect(&dispatcher, &files).len(), 2);
    }

    #[test]
    fn test_empty_file_list() {
        let formatter = Formatter::new("fake");
        let runner = FakeFormatter::new();
        let dispatcher = Dispatcher::new(
            Invoker::new(&runner),
            &formatter,
            Mode::Check,
            8,
            CancelToken::new(),
        );

        let stats = dispatcher.run(&[], |_, _| {});
        assert_eq!(stats, DispatchStats::default());
    }
}
