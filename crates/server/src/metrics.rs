//! Lock-free counters for the chunk dispatch loop.
//!
//! The dispatch tick updates these with relaxed atomics; readers take a
//! snapshot whenever they like.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

pub struct Metrics {
    columns_prepared: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks: AtomicU64,
    deliveries: AtomicU64,
    load_failures: AtomicU64,
    direct_requests: AtomicU64,
    prepare_ns_sum: AtomicU64,

    // Prepare duration histogram
    hist_under_100us: AtomicU64,
    hist_100us_1ms: AtomicU64,
    hist_1_10ms: AtomicU64,
    hist_over_10ms: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            columns_prepared: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            direct_requests: AtomicU64::new(0),
            prepare_ns_sum: AtomicU64::new(0),
            hist_under_100us: AtomicU64::new(0),
            hist_100us_1ms: AtomicU64::new(0),
            hist_1_10ms: AtomicU64::new(0),
            hist_over_10ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// One column encoded from scratch.
    pub fn record_prepare(&self, duration: Duration, fallback: bool) {
        self.columns_prepared.fetch_add(1, Relaxed);
        if fallback {
            self.fallbacks.fetch_add(1, Relaxed);
        }
        self.prepare_ns_sum
            .fetch_add(duration.as_nanos() as u64, Relaxed);

        let bucket = match duration.as_micros() {
            0..=99 => &self.hist_under_100us,
            100..=999 => &self.hist_100us_1ms,
            1_000..=9_999 => &self.hist_1_10ms,
            _ => &self.hist_over_10ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Relaxed);
    }

    pub fn record_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Relaxed);
    }

    pub fn record_direct_request(&self) {
        self.direct_requests.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            columns_prepared: self.columns_prepared.load(Relaxed),
            cache_hits: self.cache_hits.load(Relaxed),
            fallbacks: self.fallbacks.load(Relaxed),
            deliveries: self.deliveries.load(Relaxed),
            load_failures: self.load_failures.load(Relaxed),
            direct_requests: self.direct_requests.load(Relaxed),
            prepare_ns_sum: self.prepare_ns_sum.load(Relaxed),
            hist: [
                self.hist_under_100us.load(Relaxed),
                self.hist_100us_1ms.load(Relaxed),
                self.hist_1_10ms.load(Relaxed),
                self.hist_over_10ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub columns_prepared: u64,
    pub cache_hits: u64,
    pub fallbacks: u64,
    pub deliveries: u64,
    pub load_failures: u64,
    pub direct_requests: u64,
    pub prepare_ns_sum: u64,
    /// `[<100μs, 100μs-1ms, 1-10ms, >10ms]`
    pub hist: [u64; 4],
}
