//! Monotonic per-queue counters and a rolling processing-time summary
//! (spec.md §4.3). Facets may read these but never reset them.

use std::time::Duration;

/// A coarse processing-time histogram. Bucket boundaries are chosen for
/// readability in logs/metrics exporters, not statistical precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyBuckets {
    pub under_1ms: u64,
    pub under_5ms: u64,
    pub under_20ms: u64,
    pub under_100ms: u64,
    pub over_100ms: u64,
}

impl LatencyBuckets {
    fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        if ms < 1.0 {
            self.under_1ms += 1;
        } else if ms < 5.0 {
            self.under_5ms += 1;
        } else if ms < 20.0 {
            self.under_20ms += 1;
        } else if ms < 100.0 {
            self.under_100ms += 1;
        } else {
            self.over_100ms += 1;
        }
    }
}

/// Accepted/processed/errored/dropped counters plus latency buckets for a
/// single queue.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    accepted: u64,
    processed: u64,
    errored: u64,
    dropped: u64,
    latency: LatencyBuckets,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    pub fn record_processed(&mut self, elapsed: Duration) {
        self.processed += 1;
        self.latency.record(elapsed);
    }

    pub fn record_errored(&mut self) {
        self.errored += 1;
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn errored(&self) -> u64 {
        self.errored
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn latency(&self) -> LatencyBuckets {
        self.latency
    }
}
