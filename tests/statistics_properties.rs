use std::fs;
use std::path::{Path, PathBuf};

use book_statistics::ingestion::read_books_from_path;
use book_statistics::processing::{title_case, Attribute};
use book_statistics::statistics::{process_directory, StatisticsOptions, StatisticsRequest};
use book_statistics::StatsError;

fn library() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/library")
}

fn run_library(attribute: &str, threads: usize) -> book_statistics::types::RunResult {
    let out = tempfile::tempdir().unwrap();
    let options = StatisticsOptions {
        threads,
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    };
    process_directory(library(), attribute, &options).unwrap()
}

#[test]
fn library_genres_are_ranked() {
    let result = run_library("genre", 4);

    // CATALOG.JSON and notes.txt are not book files.
    assert_eq!(result.file_count, 3);
    assert_eq!(result.book_count, 7);
    assert_eq!(result.invalid_record_count, 1);
    assert_eq!(result.error_count, 0);
    assert!(!result.timed_out);

    let got: Vec<(&str, u64)> = result.items.iter().map(|i| (i.value.as_str(), i.count)).collect();
    assert_eq!(
        got,
        vec![
            ("Romance", 3),
            ("Dystopian", 2),
            ("Political Fiction", 2),
            ("Satire", 2),
            ("Comedy", 1),
            ("Literary Fiction", 1),
            ("Post-apocalyptic", 1),
            ("Science Fiction", 1),
        ]
    );
}

#[test]
fn library_years_include_aliases_and_numeric_strings() {
    let result = run_library("year_published", 2);
    let values: Vec<&str> = result.items.iter().map(|i| i.value.as_str()).collect();
    assert_eq!(values, vec!["1813", "1815", "1945", "1949", "1965", "2005", "2006"]);
    assert!(result.items.iter().all(|i| i.count == 1));
}

#[test]
fn output_is_independent_of_thread_count() {
    for attribute in Attribute::ALL {
        let baseline = run_library(attribute.as_str(), 1);
        for threads in [2, 4, 16] {
            let other = run_library(attribute.as_str(), threads);
            assert_eq!(other.items, baseline.items, "attribute {attribute} threads {threads}");
            assert_eq!(other.book_count, baseline.book_count);
        }
    }
}

#[test]
fn counts_match_extractable_values() {
    let mut books = Vec::new();
    for name in ["classics.json", "modern.json", "single.json"] {
        books.extend(read_books_from_path(library().join(name)).unwrap());
    }
    assert_eq!(books.len(), 7);

    for attribute in Attribute::ALL {
        let result = run_library(attribute.as_str(), 4);
        let extracted: u64 = books.iter().map(|b| attribute.extract(b).len() as u64).sum();
        assert_eq!(result.total_count(), extracted, "attribute {attribute}");
        assert_eq!(result.book_count, books.len() as u64);
    }
}

#[test]
fn authors_in_both_shapes_aggregate_identically() {
    let result = run_library("author", 4);
    let got: Vec<(&str, u64)> = result.items.iter().map(|i| (i.value.as_str(), i.count)).collect();
    assert_eq!(
        got,
        vec![
            ("George Orwell", 2),
            ("Jane Austen", 2),
            ("Cormac Mccarthy", 1),
            ("Frank Herbert", 1),
            ("Kazuo Ishiguro", 1),
        ]
    );
}

#[test]
fn ranked_values_are_already_title_cased() {
    for attribute in Attribute::ALL {
        for item in run_library(attribute.as_str(), 3).items {
            assert_eq!(title_case(&item.value), item.value);
        }
    }
}

#[test]
fn repeated_runs_overwrite_the_same_document() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.json"), r#"{"title": "A", "genre": "Poetry"}"#).unwrap();

    let mut request = StatisticsRequest::new(dir.path(), "GENRE");
    request.options.output_dir = dir.path().to_path_buf();
    let first = request.run().unwrap();

    fs::write(dir.path().join("b.json"), r#"{"title": "B", "genre": "Poetry"}"#).unwrap();
    let second = request.run().unwrap();

    assert_eq!(first.output_path, second.output_path);
    let xml = fs::read_to_string(&second.output_path).unwrap();
    assert!(xml.contains("<value>Poetry</value><count>2</count>"));
}

#[test]
fn attribute_is_validated_before_the_directory() {
    let err = process_directory("/no/such/books", "publisher", &StatisticsOptions::default()).unwrap_err();
    assert!(matches!(err, StatsError::UnsupportedAttribute { .. }));

    let err = process_directory("/no/such/books", "author", &StatisticsOptions::default()).unwrap_err();
    assert!(matches!(err, StatsError::Directory { .. }));
    assert_eq!(err.exit_code(), 1);
}
