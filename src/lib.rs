//! `book-statistics` counts how often each value of a book attribute occurs across a directory
//! of JSON book files and writes a ranked XML statistics document.
//!
//! The primary entrypoint is [`statistics::process_directory`]: it discovers the `*.json` files
//! of a directory, decodes them in parallel on a bounded worker pool, aggregates the requested
//! attribute into a shared concurrent map, and writes `statistics_by_<attribute>.xml`.
//!
//! ## Inputs
//!
//! Each file holds either a JSON array of book objects or a single book object:
//!
//! ```json
//! [
//!   {"title": "1984", "author": "George Orwell", "year_published": 1949,
//!    "genre": "Dystopian, Political Fiction"},
//!   {"title": "Emma", "author": {"name": "Jane Austen", "country": "England"},
//!    "genres": ["Romance", "Satire"]}
//! ]
//! ```
//!
//! `author` may be a string or an object with `name`; `genre` may be a delimited string
//! (`,` `;` `/`) or an array. Unknown fields are ignored.
//!
//! **Supported attributes:** `title`, `author`, `year_published`, `genre`.
//!
//! Values are counted case-insensitively; the output shows the first spelling seen,
//! title-cased, ordered by count descending then value ascending.
//!
//! ## Quick example
//!
//! ```no_run
//! use book_statistics::statistics::{process_directory, StatisticsOptions};
//!
//! # fn main() -> Result<(), book_statistics::StatsError> {
//! let options = StatisticsOptions { threads: 8, ..Default::default() };
//! let result = process_directory("data/books", "genre", &options)?;
//! for item in result.items.iter().take(3) {
//!     println!("{}: {}", item.value, item.count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`statistics`]: run controller and options
//! - [`ingestion`]: file discovery, streaming JSON decoding, per-file observers
//! - [`processing`]: attribute extraction, concurrent aggregation, ranking
//! - [`execution`]: bounded worker pool with cancellation, metrics and observer hooks
//! - [`output`]: XML statistics writer
//! - [`generator`]: seeded synthetic libraries for load tests and benchmarks
//! - [`types`]: record model and run results
//! - [`error`]: error types used across the crate

pub mod error;
pub mod execution;
pub mod generator;
pub mod ingestion;
pub mod output;
pub mod processing;
pub mod statistics;
pub mod types;

pub use error::{StatsError, StatsResult};
pub use statistics::{process_directory, StatisticsOptions, StatisticsRequest};
