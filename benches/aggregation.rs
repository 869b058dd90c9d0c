//! Aggregation and ranking throughput.
//!
//! Measures the hot path of a statistics run without file I/O: extracting genres from
//! pre-decoded books, counting them into the shared aggregator from several threads, and
//! ranking the snapshot.

use std::thread;

use book_statistics::processing::{rank, Aggregator, Attribute};
use book_statistics::types::Book;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const GENRES: [&str; 8] = [
    "Romance",
    "Satire",
    "Dystopian",
    "Political Fiction",
    "Tragedy",
    "Science Fiction",
    "Poetry",
    "Essay",
];

fn books(n: usize) -> Vec<Book> {
    (0..n)
        .map(|i| Book {
            title: format!("Book {i}"),
            genres: vec![
                GENRES[i % GENRES.len()].to_string(),
                GENRES[(i * 7 + 3) % GENRES.len()].to_lowercase(),
            ],
            ..Default::default()
        })
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let data = books(20_000);

    group.bench_function("genre_single_thread_20k", |b| {
        b.iter(|| {
            let agg = Aggregator::new();
            for book in &data {
                for v in Attribute::Genre.extract(book) {
                    agg.increment(&v.normalized, &v.raw);
                }
            }
            black_box(agg.total());
        });
    });

    group.bench_function("genre_four_threads_20k", |b| {
        b.iter(|| {
            let agg = Aggregator::new();
            thread::scope(|s| {
                for chunk in data.chunks(data.len() / 4) {
                    let agg = &agg;
                    s.spawn(move || {
                        for book in chunk {
                            for v in Attribute::Genre.extract(book) {
                                agg.increment(&v.normalized, &v.raw);
                            }
                        }
                    });
                }
            });
            black_box(agg.total());
        });
    });

    group.bench_function("title_rank_20k_distinct", |b| {
        let agg = Aggregator::new();
        for book in &data {
            for v in Attribute::Title.extract(book) {
                agg.increment(&v.normalized, &v.raw);
            }
        }
        b.iter(|| black_box(rank(agg.snapshot())));
    });

    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
