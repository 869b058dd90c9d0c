//! Output of ranked statistics.
//!
//! Currently implemented:
//!
//! - [`xml`]: the `<statistics>` XML document

pub mod xml;

pub use xml::{output_file_name, write_statistics, write_statistics_to};
