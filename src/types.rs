//! Core data model types.
//!
//! The decoder produces one [`Book`] per JSON record and hands it to a callback; the ranker
//! produces [`StatisticsItem`]s; a finished run is summarized by a [`RunResult`].

use std::path::PathBuf;

use serde::Serialize;

/// Author details as decoded from the polymorphic `author` JSON field.
///
/// A plain string author only carries `name`; the object form may also carry a country and
/// a birth year.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Author {
    /// Trimmed, non-empty author name.
    pub name: String,
    /// Country of origin, if given.
    pub country: Option<String>,
    /// Birth year, if given.
    pub birth_year: Option<i32>,
}

impl Author {
    /// Create an author with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: None,
            birth_year: None,
        }
    }
}

/// A single decoded book record.
///
/// Unknown JSON fields are ignored at decode time, so the field set is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Book {
    /// Title as found in the input (may be empty).
    pub title: String,
    /// Author, or `None` when the field is absent, null, or blank.
    pub author: Option<Author>,
    /// Publication year; always positive when present.
    pub year_published: Option<i32>,
    /// Genre tokens in input order, each trimmed and non-empty.
    pub genres: Vec<String>,
}

impl Book {
    /// Author display string, empty when the author is missing.
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

/// One ranked output entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsItem {
    /// Title-cased display value.
    pub value: String,
    /// Number of occurrences.
    pub count: u64,
}

impl StatisticsItem {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Summary of one run, from directory scan to XML flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Number of `*.json` files discovered.
    pub file_count: usize,
    /// Records delivered to the aggregator across all files.
    pub book_count: u64,
    /// Records dropped for per-record constraint violations.
    pub invalid_record_count: u64,
    /// Files that failed (open, parse, cancellation, panics, abandoned on timeout).
    pub error_count: u64,
    /// Time spent in the worker pool.
    pub parse_ms: u64,
    /// Time spent ranking and writing XML.
    pub serialize_ms: u64,
    /// Wall-clock time of the whole run.
    pub total_ms: u64,
    /// Location of the written statistics document.
    pub output_path: PathBuf,
    /// Ranked statistics.
    pub items: Vec<StatisticsItem>,
    /// Whether the pool hit its join deadline.
    pub timed_out: bool,
}

impl RunResult {
    /// Number of distinct values in the output.
    pub fn unique_values(&self) -> usize {
        self.items.len()
    }

    /// Sum of counts across all items.
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|i| i.count).sum()
    }
}
