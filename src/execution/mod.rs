//! Bounded worker pool for per-file tasks.
//!
//! This module sits "below" [`crate::statistics`] and provides:
//!
//! - one task per input item on a fixed-size rayon pool (`min(requested, 2 × CPU)`, floor 1)
//! - per-task isolation: errors and panics are counted, siblings keep running
//! - a join deadline followed by cooperative cancellation and a grace period
//! - real-time metrics + observer hooks for monitoring

mod cancel;
mod observer;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{StatsError, StatsResult};

pub use cancel::CancellationToken;
pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, TracingExecutionObserver,
};

/// Default number of workers requested by the CLI.
pub const DEFAULT_THREADS: usize = 4;
/// How long a run waits for all tasks before cancelling.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// How long a run waits after cancelling before giving up on stragglers.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(60);

/// Configuration for the [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Requested worker count; clamped by [`effective_workers`].
    pub num_threads: usize,
    /// Deadline for all tasks to finish.
    pub join_timeout: Duration,
    /// Extra wait after cancellation has been requested.
    pub cancel_grace: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_THREADS,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

/// Upper bound on workers: twice the available parallelism.
pub fn max_workers() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus * 2).max(1)
}

/// `requested` clamped to `[1, 2 × CPU]`.
pub fn effective_workers(requested: usize) -> usize {
    requested.min(max_workers()).max(1)
}

/// What a pool run produced.
#[derive(Debug)]
pub struct PoolOutcome<R> {
    /// Results of tasks that succeeded, in completion order.
    pub results: Vec<R>,
    /// Failed, panicked, cancelled, or abandoned tasks.
    pub error_count: u64,
    /// Whether the join deadline expired.
    pub timed_out: bool,
}

enum TaskReport<R> {
    Done(R),
    Failed,
}

/// Fixed-size pool that runs one task per item.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("opts", &self.opts)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `effective_workers(opts.num_threads)` threads.
    pub fn new(opts: ExecutionOptions) -> StatsResult<Self> {
        let workers = effective_workers(opts.num_threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("book-stats-worker-{i}"))
            .build()?;

        Ok(Self {
            pool,
            workers,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run `task` once per item and wait for all of them.
    ///
    /// Every task receives a shared [`CancellationToken`]. A task that returns `Err` or panics
    /// is logged at warn level and counted once in [`PoolOutcome::error_count`]; it never
    /// affects its siblings. If the tasks have not all reported within
    /// [`ExecutionOptions::join_timeout`], the token is cancelled and the pool waits up to
    /// [`ExecutionOptions::cancel_grace`] more; tasks still unaccounted for after that are
    /// counted as errors.
    pub fn run<I, R, F>(&self, items: Vec<I>, task: F) -> PoolOutcome<R>
    where
        I: fmt::Debug + Send + 'static,
        R: Send + 'static,
        F: Fn(&I, &CancellationToken) -> StatsResult<R> + Send + Sync + 'static,
    {
        let start = Instant::now();
        let total = items.len();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            tasks: total,
            workers: self.workers,
        });

        let token = CancellationToken::new();
        let task = Arc::new(task);
        let (tx, rx) = crossbeam_channel::unbounded::<TaskReport<R>>();

        for item in items {
            let tx = tx.clone();
            let task = Arc::clone(&task);
            let token = token.clone();
            let metrics = Arc::clone(&self.metrics);
            let observer = self.observer.clone();
            self.pool.spawn(move || {
                let report = run_one(&item, &token, task.as_ref(), &metrics, observer.as_deref());
                let _ = tx.send(report);
            });
        }
        drop(tx);

        let mut outcome = PoolOutcome {
            results: Vec::with_capacity(total),
            error_count: 0,
            timed_out: false,
        };
        let mut received = 0usize;
        let mut deadline = deadline_after(start, self.opts.join_timeout);
        let mut in_grace = false;

        while received < total {
            let wait = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(TaskReport::Done(r)) => {
                    received += 1;
                    outcome.results.push(r);
                }
                Ok(TaskReport::Failed) => {
                    received += 1;
                    outcome.error_count += 1;
                }
                Err(RecvTimeoutError::Timeout) if !in_grace => {
                    outcome.timed_out = true;
                    in_grace = true;
                    tracing::warn!(
                        pending = total - received,
                        timeout = ?self.opts.join_timeout,
                        "timed out waiting for tasks; requesting cancellation"
                    );
                    self.emit(ExecutionEvent::JoinTimedOut {
                        pending: total - received,
                    });
                    token.cancel();
                    deadline = deadline_after(Instant::now(), self.opts.cancel_grace);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    let abandoned = total - received;
                    tracing::warn!(abandoned, "tasks did not finish after cancellation");
                    outcome.error_count += abandoned as u64;
                    break;
                }
            }
        }

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        self.emit(ExecutionEvent::RunFinished {
            elapsed,
            metrics: self.metrics.snapshot(),
        });
        outcome
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn deadline_after(from: Instant, wait: Duration) -> Instant {
    // Effectively unbounded waits saturate to a far-future instant.
    from.checked_add(wait)
        .unwrap_or_else(|| from + Duration::from_secs(100 * 365 * 24 * 3600))
}

fn run_one<I, R, F>(
    item: &I,
    token: &CancellationToken,
    task: &F,
    metrics: &ExecutionMetrics,
    observer: Option<&dyn ExecutionObserver>,
) -> TaskReport<R>
where
    I: fmt::Debug,
    F: Fn(&I, &CancellationToken) -> StatsResult<R>,
{
    let label = format!("{item:?}");
    metrics.on_task_start();
    if let Some(obs) = observer {
        obs.on_event(&ExecutionEvent::TaskStarted { label: label.clone() });
    }

    let result = if token.is_cancelled() {
        Err(TaskFailure::NotStarted)
    } else {
        match panic::catch_unwind(AssertUnwindSafe(|| task(item, token))) {
            Ok(Ok(r)) => Ok(r),
            Ok(Err(e)) => Err(TaskFailure::Error(e)),
            Err(payload) => Err(TaskFailure::Panic(panic_message(payload.as_ref()))),
        }
    };

    let ok = result.is_ok();
    if let Err(failure) = &result {
        tracing::warn!(task = %label, error = %failure, "task failed");
    }
    metrics.on_task_end(ok);
    if let Some(obs) = observer {
        obs.on_event(&ExecutionEvent::TaskFinished { label, ok });
    }

    match result {
        Ok(r) => TaskReport::Done(r),
        Err(_) => TaskReport::Failed,
    }
}

enum TaskFailure {
    NotStarted,
    Error(StatsError),
    Panic(String),
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::NotStarted => f.write_str("cancelled before start"),
            TaskFailure::Error(e) => write!(f, "{e}"),
            TaskFailure::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn opts(threads: usize) -> ExecutionOptions {
        ExecutionOptions {
            num_threads: threads,
            ..Default::default()
        }
    }

    #[test]
    fn effective_workers_is_clamped() {
        assert_eq!(effective_workers(0), 1);
        assert_eq!(effective_workers(1), 1);
        assert_eq!(effective_workers(usize::MAX), max_workers());
    }

    #[test]
    fn runs_every_task_and_collects_results() {
        let pool = WorkerPool::new(opts(4)).unwrap();
        let outcome = pool.run((0..50).collect::<Vec<u32>>(), |n, _| Ok(*n * 2));
        assert_eq!(outcome.error_count, 0);
        assert!(!outcome.timed_out);
        let mut results = outcome.results;
        results.sort();
        assert_eq!(results, (0..50).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn errors_and_panics_are_isolated() {
        let pool = WorkerPool::new(opts(2)).unwrap();
        let outcome = pool.run(vec![1u32, 2, 3, 4], |n, _| match n {
            2 => Err(StatsError::Cancelled {
                path: "two.json".into(),
            }),
            3 => panic!("boom"),
            _ => Ok(*n),
        });
        assert_eq!(outcome.error_count, 2);
        let mut results = outcome.results;
        results.sort();
        assert_eq!(results, vec![1, 4]);

        let snap = pool.metrics().snapshot();
        assert_eq!(snap.tasks_started, 4);
        assert_eq!(snap.tasks_failed, 2);
    }

    #[test]
    fn tasks_run_concurrently() {
        let pool = WorkerPool::new(opts(4)).unwrap();
        if pool.workers() < 2 {
            return;
        }
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let (a, m) = (Arc::clone(&active), Arc::clone(&max_active));
        let outcome = pool.run((0..16).collect::<Vec<u32>>(), move |_, _| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(outcome.results.len(), 16);
        assert!(max_active.load(Ordering::SeqCst) > 1);
        assert!(pool.metrics().snapshot().max_active_tasks <= pool.workers());
    }

    #[test]
    fn join_timeout_cancels_cooperative_tasks() {
        let pool = WorkerPool::new(ExecutionOptions {
            num_threads: 2,
            join_timeout: Duration::from_millis(50),
            cancel_grace: Duration::from_secs(5),
        })
        .unwrap();

        let outcome: PoolOutcome<()> = pool.run(vec!["slow-a", "slow-b"], |name, token| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Err(StatsError::Cancelled {
                path: (*name).into(),
            })
        });
        assert!(outcome.timed_out);
        assert_eq!(outcome.error_count, 2);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn stragglers_past_grace_are_abandoned_as_errors() {
        let pool = WorkerPool::new(ExecutionOptions {
            num_threads: 1,
            join_timeout: Duration::from_millis(20),
            cancel_grace: Duration::from_millis(20),
        })
        .unwrap();

        let outcome = pool.run(vec![()], |_, _| {
            thread::sleep(Duration::from_millis(300));
            Ok(())
        });
        assert!(outcome.timed_out);
        assert_eq!(outcome.error_count, 1);
    }
}
