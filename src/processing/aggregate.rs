//! Concurrent frequency aggregation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

struct CounterCell {
    display_raw: String,
    count: AtomicU64,
}

/// A read-only view of one counter after the workers have joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSnapshot {
    pub normalized: String,
    /// First raw value seen for this key.
    pub display_raw: String,
    pub count: u64,
}

/// Map from normalized key to `(count, first raw value)`, shared by all workers.
///
/// Existing keys are bumped with an atomic add under a shard read guard, so concurrent
/// increments of different keys never contend on a map-wide lock. New keys go through the
/// shard's entry API: at most one cell is created per key and the first writer's raw value is
/// kept.
#[derive(Default)]
pub struct Aggregator {
    cells: DashMap<String, CounterCell>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `normalized`, remembering `raw` if the key is new.
    pub fn increment(&self, normalized: &str, raw: &str) {
        if let Some(cell) = self.cells.get(normalized) {
            cell.count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.cells
            .entry(normalized.to_owned())
            .or_insert_with(|| CounterCell {
                display_raw: raw.to_owned(),
                count: AtomicU64::new(0),
            })
            .count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .map(|e| e.value().count.load(Ordering::Relaxed))
            .sum()
    }

    /// Enumerate all cells. Call after the workers have joined.
    pub fn snapshot(&self) -> Vec<CellSnapshot> {
        self.cells
            .iter()
            .map(|e| CellSnapshot {
                normalized: e.key().clone(),
                display_raw: e.value().display_raw.clone(),
                count: e.value().count.load(Ordering::Relaxed),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Aggregator;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_raw_value_wins() {
        let agg = Aggregator::new();
        agg.increment("romance", "Romance");
        agg.increment("romance", "ROMANCE");
        agg.increment("satire", "satire");

        let mut snap = agg.snapshot();
        snap.sort_by(|a, b| a.normalized.cmp(&b.normalized));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].display_raw, "Romance");
        assert_eq!(snap[0].count, 2);
        assert_eq!(snap[1].count, 1);
        assert_eq!(agg.total(), 3);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let agg = Arc::new(Aggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = format!("k{}", i % 10);
                        agg.increment(&key, &format!("raw-{t}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(agg.len(), 10);
        assert_eq!(agg.total(), 8_000);
        assert!(agg.snapshot().iter().all(|c| c.count == 800 && c.display_raw.starts_with("raw-")));
    }
}
