//! Streaming JSON decoder for book files.
//!
//! Supported inputs:
//! - A JSON array of book objects: `[{"title":"1984"}, {"title":"Emma"}]`
//! - A single book object: `{"title":"1984"}`
//!
//! Files are read through a buffered reader and a token-level `serde_json` deserializer, so
//! the document is never materialized: each record is decoded, handed to the caller's
//! callback, and dropped before the next one is read. Array children that are not objects
//! are skipped together with their subtree. An empty document, or one whose root is a scalar,
//! yields zero records and a warning.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use serde::Serialize;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::{StatsError, StatsResult};
use crate::execution::CancellationToken;
use crate::types::Book;

use super::fields::{AuthorField, GenreField, TitleField, YearField};

const IN_MEMORY_SOURCE: &str = "<memory>";

/// Per-file decoding counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Records handed to the callback.
    pub records: u64,
    /// Records dropped because a field violated its constraints.
    pub invalid_records: u64,
}

/// Decode the book file at `path`, invoking `on_record` once per record in document order.
///
/// Returns [`StatsError::FileOpen`] if the file cannot be opened, [`StatsError::Read`] if
/// reading fails midway, [`StatsError::JsonParse`] on malformed input (records delivered
/// before the error stay delivered), and [`StatsError::Cancelled`] if `cancel` fires between
/// records.
pub fn decode_path(
    path: impl AsRef<Path>,
    cancel: &CancellationToken,
    on_record: impl FnMut(Book),
) -> StatsResult<DecodeStats> {
    decode_path_with(path, cancel, on_record, |_| {})
}

/// Like [`decode_path`], also calling `on_invalid` for each record dropped for a field
/// constraint violation, as it happens.
pub fn decode_path_with(
    path: impl AsRef<Path>,
    cancel: &CancellationToken,
    on_record: impl FnMut(Book),
    on_invalid: impl FnMut(&StatsError),
) -> StatsResult<DecodeStats> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| StatsError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    decode_reader_with(file, path, cancel, on_record, on_invalid)
}

/// Decode books from any reader. `source` is only used for diagnostics.
pub fn decode_reader<R: Read>(
    reader: R,
    source: impl AsRef<Path>,
    cancel: &CancellationToken,
    on_record: impl FnMut(Book),
) -> StatsResult<DecodeStats> {
    decode_reader_with(reader, source, cancel, on_record, |_| {})
}

/// [`decode_reader`] with an `on_invalid` hook; see [`decode_path_with`].
pub fn decode_reader_with<R: Read>(
    reader: R,
    source: impl AsRef<Path>,
    cancel: &CancellationToken,
    on_record: impl FnMut(Book),
    on_invalid: impl FnMut(&StatsError),
) -> StatsResult<DecodeStats> {
    let source = source.as_ref();
    let mut reader = BufReader::new(reader);

    let has_content = skip_leading_whitespace(&mut reader).map_err(|e| StatsError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    if !has_content {
        tracing::warn!(path = %source.display(), "empty json file");
        return Ok(DecodeStats::default());
    }

    let mut state = DecodeState {
        source,
        cancel,
        on_record,
        on_invalid,
        stats: DecodeStats::default(),
        cancelled: false,
    };

    let mut de = serde_json::Deserializer::from_reader(reader);
    let result = RootSeed { state: &mut state }.deserialize(&mut de);

    match result {
        Ok(()) => Ok(state.stats),
        Err(_) if state.cancelled => Err(StatsError::Cancelled {
            path: source.to_path_buf(),
        }),
        Err(e) if e.is_io() => Err(StatsError::Read {
            path: source.to_path_buf(),
            source: io::Error::from(e),
        }),
        Err(e) => Err(StatsError::JsonParse {
            path: source.to_path_buf(),
            source: e,
        }),
    }
}

/// Decode books from an in-memory JSON string.
pub fn decode_str(
    input: &str,
    cancel: &CancellationToken,
    on_record: impl FnMut(Book),
) -> StatsResult<DecodeStats> {
    decode_reader(input.as_bytes(), IN_MEMORY_SOURCE, cancel, on_record)
}

/// Read every valid book of a file into memory.
///
/// Intended for bulk-import callers that need the whole batch; statistics runs use
/// [`decode_path`] and never hold more than one record.
pub fn read_books_from_path(path: impl AsRef<Path>) -> StatsResult<Vec<Book>> {
    let mut books = Vec::new();
    decode_path(path, &CancellationToken::new(), |b| books.push(b))?;
    Ok(books)
}

/// Skips whitespace and a UTF-8 byte-order mark. Returns `false` at end of input.
fn skip_leading_whitespace<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut at_start = true;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        if at_start && buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
            reader.consume(3);
            at_start = false;
            continue;
        }
        at_start = false;
        let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if skip < buf.len() {
            reader.consume(skip);
            return Ok(true);
        }
        reader.consume(skip);
    }
}

struct DecodeState<'a, F, G> {
    source: &'a Path,
    cancel: &'a CancellationToken,
    on_record: F,
    on_invalid: G,
    stats: DecodeStats,
    cancelled: bool,
}

impl<F: FnMut(Book), G: FnMut(&StatsError)> DecodeState<'_, F, G> {
    /// Record boundary: returns an error that unwinds the deserializer if cancelled.
    fn check_cancelled<E: de::Error>(&mut self) -> Result<(), E> {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            return Err(E::custom("decoding cancelled"));
        }
        Ok(())
    }

    fn deliver(&mut self, outcome: StatsResult<Book>) {
        match outcome {
            Ok(book) => {
                self.stats.records += 1;
                (self.on_record)(book);
            }
            Err(err) => {
                self.stats.invalid_records += 1;
                (self.on_invalid)(&err);
                tracing::warn!(path = %self.source.display(), error = %err, "dropping invalid record");
            }
        }
    }

    fn unsupported_root(&self, kind: &str) {
        tracing::warn!(path = %self.source.display(), root = kind, "unsupported root token");
    }
}

struct RootSeed<'s, 'a, F, G> {
    state: &'s mut DecodeState<'a, F, G>,
}

impl<'de, F: FnMut(Book), G: FnMut(&StatsError)> DeserializeSeed<'de> for RootSeed<'_, '_, F, G> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, F: FnMut(Book), G: FnMut(&StatsError)> Visitor<'de> for RootSeed<'_, '_, F, G> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a book object or an array of book objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        loop {
            self.state.check_cancelled::<A::Error>()?;
            match seq.next_element_seed(ElementSeed)? {
                None => return Ok(()),
                Some(Some(outcome)) => self.state.deliver(outcome),
                Some(None) => {}
            }
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<(), A::Error> {
        self.state.check_cancelled::<A::Error>()?;
        let outcome = decode_record(map)?;
        self.state.deliver(outcome);
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        self.state.unsupported_root("string");
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        self.state.unsupported_root("boolean");
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        self.state.unsupported_root("number");
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        self.state.unsupported_root("number");
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        self.state.unsupported_root("number");
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.state.unsupported_root("null");
        Ok(())
    }
}

/// One child of a root array: `Some` for objects, `None` for anything else (skipped).
struct ElementSeed;

impl<'de> DeserializeSeed<'de> for ElementSeed {
    type Value = Option<StatsResult<Book>>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ElementSeed {
    type Value = Option<StatsResult<Book>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a book object")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        decode_record(map).map(Some)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

/// Decode one book object.
///
/// The outer `Result` carries syntax errors and aborts the file; the inner one carries field
/// constraint violations and only drops this record. All entries are consumed either way.
fn decode_record<'de, A: MapAccess<'de>>(mut map: A) -> Result<StatsResult<Book>, A::Error> {
    let mut title = TitleField::default();
    let mut author = AuthorField::default();
    let mut year = YearField::default();
    let mut genre = GenreField::default();
    let mut genres_alias = GenreField::default();

    while let Some(key) = map.next_key::<String>()? {
        match key.as_str() {
            "title" => title = map.next_value()?,
            "author" => author = map.next_value()?,
            "year_published" | "yearPublished" => year = map.next_value()?,
            "genre" => genre = map.next_value()?,
            "genres" => genres_alias = map.next_value()?,
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
    }

    let genre = if genre.is_missing() { genres_alias } else { genre };
    Ok(build_book(title, author, year, genre))
}

fn build_book(
    title: TitleField,
    author: AuthorField,
    year: YearField,
    genre: GenreField,
) -> StatsResult<Book> {
    Ok(Book {
        title: title.into_title(),
        author: author.into_author()?,
        year_published: year.into_year()?,
        genres: genre.into_genres(),
    })
}
