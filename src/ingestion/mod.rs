//! Ingestion: file discovery, streaming JSON decoding, and per-file observability.
//!
//! Most callers go through [`crate::statistics::process_directory`]. The decoder is also
//! usable on its own:
//! - [`json::decode_path`] streams books from a file into a callback
//! - [`json::read_books_from_path`] collects a file's books for bulk import
//! - [`discovery::discover_json_files`] lists the `*.json` files of a directory

pub mod discovery;
pub mod fields;
pub mod json;
pub mod observability;

pub use discovery::discover_json_files;
pub use json::{
    decode_path, decode_path_with, decode_reader, decode_reader_with, decode_str, read_books_from_path,
    DecodeStats,
};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, TracingObserver,
    report_outcome,
};
