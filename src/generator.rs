//! Synthetic book libraries for load testing.
//!
//! [`generate_library`] writes `books_001.json`, `books_002.json`, ... into a directory, each a
//! pretty-printed array of books with a string author, a year in `1900..=2024` and one to three
//! distinct genres joined by `", "`. A fixed seed reproduces the same files byte for byte.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{StatsError, StatsResult};

pub const AUTHORS: [&str; 16] = [
    "George Orwell",
    "Jane Austen",
    "William Shakespeare",
    "Charles Dickens",
    "Mark Twain",
    "Leo Tolstoy",
    "F. Scott Fitzgerald",
    "Ernest Hemingway",
    "Virginia Woolf",
    "James Joyce",
    "Franz Kafka",
    "Gabriel García Márquez",
    "Toni Morrison",
    "Haruki Murakami",
    "Margaret Atwood",
    "Salman Rushdie",
];

pub const GENRES: [&str; 20] = [
    "Fiction",
    "Non-Fiction",
    "Science Fiction",
    "Fantasy",
    "Mystery",
    "Thriller",
    "Romance",
    "Horror",
    "Biography",
    "History",
    "Self-Help",
    "Poetry",
    "Drama",
    "Adventure",
    "Comedy",
    "Dystopian",
    "Political Fiction",
    "Satire",
    "Tragedy",
    "Epic",
];

const TITLE_PREFIXES: [&str; 15] = [
    "The Great",
    "A Tale of",
    "The Secret",
    "Journey to",
    "The Last",
    "Beyond the",
    "In Search of",
    "The Lost",
    "Return to",
    "The Mystery of",
    "Adventures in",
    "The Chronicles of",
    "Echoes of",
    "Shadows of",
    "The Legend of",
];

const TITLE_SUFFIXES: [&str; 15] = [
    "Dreams",
    "Tomorrow",
    "Yesterday",
    "Paradise",
    "Darkness",
    "Light",
    "Time",
    "Space",
    "Memory",
    "Hope",
    "Freedom",
    "Truth",
    "Justice",
    "Power",
    "Destiny",
];

/// Years are drawn from this inclusive range.
pub const YEARS: std::ops::RangeInclusive<i32> = 1900..=2024;

/// Size and seed of a generated library.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub files: usize,
    pub books_per_file: usize,
    /// `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            files: 10,
            books_per_file: 1000,
            seed: None,
        }
    }
}

#[derive(Serialize)]
struct GeneratedBook {
    title: String,
    author: &'static str,
    year_published: i32,
    genre: String,
}

/// Write a synthetic library into `dir`, creating it if needed, and return the file paths in
/// order. Existing files with the same names are overwritten.
pub fn generate_library(dir: impl AsRef<Path>, options: &GeneratorOptions) -> StatsResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| output_error(dir, e))?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    tracing::info!(
        dir = %dir.display(),
        files = options.files,
        books_per_file = options.books_per_file,
        total = options.files.saturating_mul(options.books_per_file),
        "generating library"
    );

    let mut paths = Vec::with_capacity(options.files);
    for i in 1..=options.files {
        let books: Vec<GeneratedBook> = (0..options.books_per_file).map(|_| random_book(&mut rng)).collect();
        let path = dir.join(format!("books_{i:03}.json"));
        write_books(&path, &books)?;
        paths.push(path);

        if i % 10 == 0 || i == options.files {
            tracing::info!(done = i, of = options.files, "generated files");
        }
    }
    Ok(paths)
}

fn random_book(rng: &mut StdRng) -> GeneratedBook {
    let prefix = TITLE_PREFIXES[rng.gen_range(0..TITLE_PREFIXES.len())];
    let suffix = TITLE_SUFFIXES[rng.gen_range(0..TITLE_SUFFIXES.len())];
    let genre_count = rng.gen_range(1..=3);
    let genres: Vec<&str> = GENRES.choose_multiple(rng, genre_count).copied().collect();

    GeneratedBook {
        title: format!("{prefix} {suffix}"),
        author: AUTHORS[rng.gen_range(0..AUTHORS.len())],
        year_published: rng.gen_range(YEARS),
        genre: genres.join(", "),
    }
}

fn write_books(path: &Path, books: &[GeneratedBook]) -> StatsResult<()> {
    let file = File::create(path).map_err(|e| output_error(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, books).map_err(|e| output_error(path, e))?;
    out.flush().map_err(|e| output_error(path, e))
}

fn output_error(path: &Path, err: impl std::fmt::Display) -> StatsError {
    StatsError::OutputWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
