//! Directory-level statistics runs.
//!
//! [`process_directory`] ties the pieces together: discovery, one pool task per file, the
//! shared [`Aggregator`], ranking, and the XML document.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{StatsError, StatsResult};
use crate::execution::{
    DEFAULT_CANCEL_GRACE, DEFAULT_JOIN_TIMEOUT, DEFAULT_THREADS, ExecutionObserver, ExecutionOptions,
    WorkerPool,
};
use crate::ingestion::{
    IngestionContext, IngestionObserver, IngestionSeverity, decode_path_with, discover_json_files,
    report_outcome,
};
use crate::output::{output_file_name, write_statistics};
use crate::processing::{Aggregator, Attribute, CellSnapshot, rank};
use crate::types::{Book, RunResult};

/// Options controlling a statistics run.
#[derive(Clone)]
pub struct StatisticsOptions {
    /// Requested worker count (clamped to `[1, 2 × CPU]`).
    pub threads: usize,
    /// Directory receiving `statistics_by_<attribute>.xml`.
    pub output_dir: PathBuf,
    /// Deadline for all file tasks.
    pub join_timeout: Duration,
    /// Extra wait after cancellation before stragglers are abandoned.
    pub cancel_grace: Duration,
    /// Optional per-file observer.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Minimum severity that triggers [`IngestionObserver::on_alert`].
    pub alert_at_or_above: IngestionSeverity,
    /// Optional observer for pool events.
    pub execution_observer: Option<Arc<dyn ExecutionObserver>>,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            output_dir: PathBuf::from("."),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            execution_observer: None,
        }
    }
}

impl fmt::Debug for StatisticsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsOptions")
            .field("threads", &self.threads)
            .field("output_dir", &self.output_dir)
            .field("join_timeout", &self.join_timeout)
            .field("cancel_grace", &self.cancel_grace)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("execution_observer_set", &self.execution_observer.is_some())
            .finish()
    }
}

/// Count occurrences of `attribute` across every `*.json` file directly inside `dir`.
///
/// Per-file failures (unreadable files, malformed JSON, cancellation) are logged, reported to
/// [`StatisticsOptions::observer`] and counted in [`RunResult::error_count`]; records a file
/// delivered before failing stay counted. Only usage errors, a missing directory, pool
/// construction failures and output write failures abort the run.
///
/// ```no_run
/// use book_statistics::statistics::{process_directory, StatisticsOptions};
///
/// # fn main() -> Result<(), book_statistics::StatsError> {
/// let result = process_directory("books/", "genre", &StatisticsOptions::default())?;
/// println!("{} books -> {}", result.book_count, result.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn process_directory(
    dir: impl AsRef<Path>,
    attribute: &str,
    options: &StatisticsOptions,
) -> StatsResult<RunResult> {
    let started = Instant::now();
    let dir = dir.as_ref();
    let attribute: Attribute = attribute.parse()?;
    if !dir.is_dir() {
        return Err(StatsError::Directory {
            path: dir.to_path_buf(),
        });
    }

    let files = discover_json_files(dir)?;
    let file_count = files.len();

    let mut pool = WorkerPool::new(ExecutionOptions {
        num_threads: options.threads,
        join_timeout: options.join_timeout,
        cancel_grace: options.cancel_grace,
    })?;
    if let Some(obs) = &options.execution_observer {
        pool = pool.with_observer(Arc::clone(obs));
    }
    if pool.workers() < options.threads {
        tracing::warn!(
            requested = options.threads,
            workers = pool.workers(),
            "requested worker count capped"
        );
    }
    tracing::info!(
        dir = %dir.display(),
        %attribute,
        files = file_count,
        workers = pool.workers(),
        "starting statistics run"
    );

    let tally = Arc::new(RunTally::new());

    let parse_started = Instant::now();
    let outcome = {
        let tally = Arc::clone(&tally);
        let observer = options.observer.clone();
        let alert_at_or_above = options.alert_at_or_above;

        pool.run(files, move |path: &PathBuf, cancel| {
            let result = decode_path_with(
                path,
                cancel,
                |book| tally.add_book(attribute, &book),
                |_| tally.add_invalid(),
            );

            match &result {
                Ok(stats) => tracing::debug!(
                    path = %path.display(),
                    records = stats.records,
                    invalid = stats.invalid_records,
                    "file processed"
                ),
                Err(e) if e.is_fatal() => tracing::error!(path = %path.display(), error = %e, "file failed"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "file skipped"),
            }
            if let Some(obs) = &observer {
                let ctx = IngestionContext { path: path.clone() };
                report_outcome(obs.as_ref(), alert_at_or_above, &ctx, result.as_ref().copied());
            }
            result
        })
    };
    let parse_ms = elapsed_ms(parse_started);
    let (book_count, invalid_record_count, cells) = tally.close();

    let serialize_started = Instant::now();
    let items = rank(cells);
    let output_path = options.output_dir.join(output_file_name(attribute.as_str()));
    write_statistics(&output_path, &items)?;
    let serialize_ms = elapsed_ms(serialize_started);

    let result = RunResult {
        file_count,
        book_count,
        invalid_record_count,
        error_count: outcome.error_count,
        parse_ms,
        serialize_ms,
        total_ms: elapsed_ms(started),
        output_path,
        items,
        timed_out: outcome.timed_out,
    };
    tracing::info!(
        files = result.file_count,
        books = result.book_count,
        errors = result.error_count,
        unique_values = result.unique_values(),
        parse_ms = result.parse_ms,
        serialize_ms = result.serialize_ms,
        output = %result.output_path.display(),
        "statistics run finished"
    );
    Ok(result)
}

/// Counters shared by the file tasks of one run.
///
/// [`RunTally::close`] waits for in-flight updates and turns every later one into a no-op, so
/// tasks still running after the pool gave up on them cannot change the reported result.
struct RunTally {
    open: RwLock<bool>,
    aggregator: Aggregator,
    books: AtomicU64,
    invalid: AtomicU64,
}

impl RunTally {
    fn new() -> Self {
        Self {
            open: RwLock::new(true),
            aggregator: Aggregator::new(),
            books: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
        }
    }

    fn add_book(&self, attribute: Attribute, book: &Book) {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return;
        }
        self.books.fetch_add(1, Ordering::Relaxed);
        for value in attribute.extract(book) {
            self.aggregator.increment(&value.normalized, &value.raw);
        }
    }

    fn add_invalid(&self) {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if *open {
            self.invalid.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stop accepting updates and return `(books, invalid records, cells)`.
    fn close(&self) -> (u64, u64, Vec<CellSnapshot>) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = false;
        (
            self.books.load(Ordering::SeqCst),
            self.invalid.load(Ordering::SeqCst),
            self.aggregator.snapshot(),
        )
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().min(u64::MAX as u128) as u64
}

/// Owned bundle of run inputs, e.g. for queueing runs in a job system.
#[derive(Debug, Clone)]
pub struct StatisticsRequest {
    /// Directory holding the `*.json` book files.
    pub dir: PathBuf,
    /// Attribute name (`title`, `author`, `year_published`, `genre`).
    pub attribute: String,
    /// Options controlling the run.
    pub options: StatisticsOptions,
}

impl StatisticsRequest {
    pub fn new(dir: impl Into<PathBuf>, attribute: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            attribute: attribute.into(),
            options: StatisticsOptions::default(),
        }
    }

    /// Execute the request by calling [`process_directory`].
    pub fn run(&self) -> StatsResult<RunResult> {
        process_directory(&self.dir, &self.attribute, &self.options)
    }
}
