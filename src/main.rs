//! Command-line entrypoint.
//!
//! ```bash
//! book-statistics --dir data/books --attribute genre [--threads 8] [--output-dir out] [--json]
//! ```
//!
//! Exit codes: `0` success, `1` usage error or missing directory, `2` processing failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::error;

use book_statistics::execution::{DEFAULT_THREADS, TracingExecutionObserver};
use book_statistics::ingestion::TracingObserver;
use book_statistics::statistics::{StatisticsOptions, process_directory};
use book_statistics::types::RunResult;
use book_statistics::StatsError;

const TOP_N: usize = 10;

/// Attribute frequency statistics for a directory of JSON book files
#[derive(Parser, Debug)]
#[command(name = "book-statistics", version)]
struct Cli {
    /// Directory containing the *.json book files
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,

    /// Attribute to aggregate: title, author, year_published or genre
    #[arg(long, value_name = "NAME")]
    attribute: String,

    /// Worker threads (capped at twice the CPU count)
    #[arg(
        long,
        env = "BOOK_STATS_THREADS",
        default_value_t = DEFAULT_THREADS as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    threads: u64,

    /// Directory receiving statistics_by_<attribute>.xml
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print the run result as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            let err = StatsError::usage(e.kind().as_str().unwrap_or("invalid arguments"));
            error!(error = %err, "invalid command line");
            return exit_code(&err);
        }
    };

    let options = StatisticsOptions {
        threads: usize::try_from(cli.threads).unwrap_or(usize::MAX),
        output_dir: cli.output_dir,
        observer: Some(Arc::new(TracingObserver)),
        execution_observer: Some(Arc::new(TracingExecutionObserver)),
        ..Default::default()
    };

    match process_directory(&cli.dir, &cli.attribute, &options) {
        Ok(result) => {
            if cli.json {
                match serde_json::to_string_pretty(&result) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        error!(error = %e, "failed to serialize run result");
                        return ExitCode::from(2);
                    }
                }
            } else {
                print_summary(&cli.attribute, &result);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "statistics run failed");
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}

fn exit_code(err: &StatsError) -> ExitCode {
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2))
}

fn print_summary(attribute: &str, result: &RunResult) {
    println!("Statistics by {attribute}");
    println!("  files scanned:   {}", result.file_count);
    println!("  books parsed:    {}", result.book_count);
    println!("  invalid records: {}", result.invalid_record_count);
    println!("  file errors:     {}", result.error_count);
    println!("  unique values:   {}", result.unique_values());
    if result.timed_out {
        println!("  (timed out; results are partial)");
    }

    if !result.items.is_empty() {
        println!();
        println!("Top {}:", TOP_N.min(result.items.len()));
        for (i, item) in result.items.iter().take(TOP_N).enumerate() {
            println!("  {:>2}. {} ({})", i + 1, item.value, item.count);
        }
    }

    println!();
    println!("Output: {}", result.output_path.display());
    println!(
        "Timing: parse {} ms, serialize {} ms, total {} ms",
        result.parse_ms, result.serialize_ms, result.total_ms
    );
}
