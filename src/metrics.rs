//! Metrics collection for the client layer
//!
//! Thread-safe counters using atomic operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for requests, retries and the caching helpers
#[derive(Debug, Default)]
pub struct ClientMetrics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    retries: AtomicU64,
    auth_failures: AtomicU64,

    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    deduplicated: AtomicU64,

    // Stored as microseconds
    total_request_duration_us: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retries: u64,
    pub auth_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub deduplicated: u64,
    pub total_request_duration_us: u64,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished call to `send`
    pub fn record_request(&self, success: bool, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.total_request_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller joined a request that was already in flight
    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            total_request_duration_us: self.total_request_duration_us.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.auth_failures.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.deduplicated.store(0, Ordering::Relaxed);
        self.total_request_duration_us.store(0, Ordering::Relaxed);
    }
}

impl MetricsSnapshot {
    /// Cache hit rate as a percentage (0-100)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }

    pub fn avg_request_duration_ms(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.total_request_duration_us as f64 / self.total_requests as f64) / 1000.0
        }
    }
}
