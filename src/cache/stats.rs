//! Cache Statistics Module
//!
//! Tracks cache operation counters: hits, misses, stale reads, writes and drops.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live entry
    pub hits: u64,
    /// Reads that found no record
    pub misses: u64,
    /// Reads that found a record past its ttl (also a miss to the caller)
    pub stale: u64,
    /// Records written
    pub writes: u64,
    /// Writes skipped because ttl <= 0
    pub skipped_writes: u64,
    /// Drop calls that completed
    pub drops: u64,
    /// Rows removed by background sweeps
    pub swept: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses + stale), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by concurrent operations.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    writes: AtomicU64,
    skipped_writes: AtomicU64,
    drops: AtomicU64,
    swept: AtomicU64,
}

impl StatsRecorder {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_write(&self) {
        self.skipped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsRecorder::default().snapshot();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_stale_as_miss() {
        let recorder = StatsRecorder::default();
        recorder.record_hit();
        recorder.record_miss();
        recorder.record_stale();
        recorder.record_hit();

        assert_eq!(recorder.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_record_writes_and_sweeps() {
        let recorder = StatsRecorder::default();
        recorder.record_write();
        recorder.record_skipped_write();
        recorder.record_drop();
        recorder.record_swept(3);
        recorder.record_swept(2);

        let stats = recorder.snapshot();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.skipped_writes, 1);
        assert_eq!(stats.drops, 1);
        assert_eq!(stats.swept, 5);
    }
}
