//! Turning decoded books into ranked statistics.
//!
//! - [`extract`]: per-record attribute values ([`Attribute::extract`])
//! - [`aggregate`]: concurrent counting keyed by normalized value ([`Aggregator`])
//! - [`rank`]: title-casing and deterministic ordering ([`rank()`])
//!
//! ## Example: extract → aggregate → rank
//!
//! ```rust
//! use book_statistics::processing::{rank, Aggregator, Attribute};
//! use book_statistics::types::Book;
//!
//! let books = vec![
//!     Book { genres: vec!["Romance".into(), "Satire".into()], ..Default::default() },
//!     Book { genres: vec!["romance".into()], ..Default::default() },
//! ];
//!
//! let agg = Aggregator::new();
//! for book in &books {
//!     for v in Attribute::Genre.extract(book) {
//!         agg.increment(&v.normalized, &v.raw);
//!     }
//! }
//!
//! let items = rank(agg.snapshot());
//! assert_eq!(items[0].value, "Romance");
//! assert_eq!(items[0].count, 2);
//! ```

pub mod aggregate;
pub mod extract;
pub mod rank;

pub use aggregate::{Aggregator, CellSnapshot};
pub use extract::{normalize, Attribute, ExtractedValue};
pub use rank::{compare_items, rank, title_case};
