//! Writes a synthetic book library for load testing.
//!
//! ```bash
//! generate-books --output-dir test-data --files 10 --books-per-file 1000 [--seed 42]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use book_statistics::generator::{GeneratorOptions, generate_library};

/// Generate books_NNN.json files of random books
#[derive(Parser, Debug)]
#[command(name = "generate-books", version)]
struct Cli {
    /// Directory to write into (created if missing)
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Number of files
    #[arg(long, default_value_t = 10)]
    files: usize,

    /// Books per file
    #[arg(long, default_value_t = 1000)]
    books_per_file: usize,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GeneratorOptions {
        files: cli.files,
        books_per_file: cli.books_per_file,
        seed: cli.seed,
    };

    match generate_library(&cli.output_dir, &options) {
        Ok(paths) => {
            println!("Wrote {} files to {}", paths.len(), cli.output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "generation failed");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2))
        }
    }
}
