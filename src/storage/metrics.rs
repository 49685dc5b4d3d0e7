use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use log::trace;

/// Counters of retrieval work done through one reader
#[derive(Debug)]
pub struct QueryMetrics {
    queries: AtomicU64,
    failed_queries: AtomicU64,
    buckets_visited: AtomicU64,
    buckets_skipped: AtomicU64,
    candidates: AtomicU64,
    verified: AtomicU64,
    emitted: AtomicU64,
    start_time: Instant,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self {
            queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            buckets_visited: AtomicU64::new(0),
            buckets_skipped: AtomicU64::new(0),
            candidates: AtomicU64::new(0),
            verified: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_queries(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
        trace!("Failed query recorded. Total failures: {}", self.failed_queries.load(Ordering::Relaxed));
    }

    pub fn record_bucket_skipped(&self) {
        self.buckets_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bucket_visit(&self, candidates: usize, verified: usize) {
        self.buckets_visited.fetch_add(1, Ordering::Relaxed);
        self.candidates.fetch_add(candidates as u64, Ordering::Relaxed);
        self.verified.fetch_add(verified as u64, Ordering::Relaxed);
    }

    pub fn record_emitted(&self, count: usize) {
        self.emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> QueryMetricsStats {
        QueryMetricsStats {
            queries: self.queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            buckets_visited: self.buckets_visited.load(Ordering::Relaxed),
            buckets_skipped: self.buckets_skipped.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::Relaxed);
        self.failed_queries.store(0, Ordering::Relaxed);
        self.buckets_visited.store(0, Ordering::Relaxed);
        self.buckets_skipped.store(0, Ordering::Relaxed);
        self.candidates.store(0, Ordering::Relaxed);
        self.verified.store(0, Ordering::Relaxed);
        self.emitted.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetricsStats {
    pub queries: u64,
    pub failed_queries: u64,
    pub buckets_visited: u64,
    pub buckets_skipped: u64,
    /// Entries surviving the pruning phase
    pub candidates: u64,
    /// Entries surviving the verification phase
    pub verified: u64,
    pub emitted: u64,
    pub uptime_seconds: u64,
}

impl QueryMetricsStats {
    /// Share of pruned candidates that turned out to match.
    pub fn candidate_precision(&self) -> f64 {
        if self.candidates == 0 {
            return 0.0;
        }
        self.emitted as f64 / self.candidates as f64
    }

    pub fn failure_rate(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        self.failed_queries as f64 / self.queries as f64
    }
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self::new()
    }
}
