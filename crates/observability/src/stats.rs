//! Task statistics collector.
//!
//! Tracks task counts, wait/execution accumulators and a fixed-width
//! latency histogram with per-field atomics so every recorder can be
//! called concurrently without external locking. Each recording also
//! feeds the `metrics` facade so an exporter installed by the host
//! observes the pool without polling.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

use flexpool_domain::value_objects::{
    TaskStatsSnapshot, DEFAULT_LATENCY_PERCENTILES, DEFAULT_MAX_LATENCY_MS, LATENCY_BUCKET_COUNT,
};

pub struct TaskStats {
    // Task counters
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,

    // Time accumulators (milliseconds)
    total_wait_ms: AtomicU64,
    total_execution_ms: AtomicU64,
    total_queue_ms: AtomicU64,

    // High-water mark of the observed queue size
    max_queue_size: AtomicU64,

    // Latency distribution: 100 linear buckets over [0, max_latency_ms)
    latency_buckets: Vec<AtomicU64>,
    percentiles: Vec<u8>,
    max_latency_ms: u64,

    start_time_ms: i64,

    // metrics facade handles
    metric_submitted: Counter,
    metric_completed: Counter,
    metric_failed: Counter,
    metric_rejected: Counter,
    metric_wait_seconds: Histogram,
    metric_execution_seconds: Histogram,
    metric_queue_size: Gauge,
}

impl TaskStats {
    pub fn new(percentiles: Vec<u8>, max_latency_ms: u64) -> Self {
        let percentiles = if percentiles.is_empty() {
            DEFAULT_LATENCY_PERCENTILES.to_vec()
        } else {
            percentiles
        };
        let latency_buckets = (0..LATENCY_BUCKET_COUNT).map(|_| AtomicU64::new(0)).collect();

        Self {
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
            total_execution_ms: AtomicU64::new(0),
            total_queue_ms: AtomicU64::new(0),
            max_queue_size: AtomicU64::new(0),
            latency_buckets,
            percentiles,
            max_latency_ms,
            start_time_ms: Utc::now().timestamp_millis(),
            metric_submitted: counter!("flexpool_tasks_submitted_total"),
            metric_completed: counter!("flexpool_tasks_completed_total"),
            metric_failed: counter!("flexpool_tasks_failed_total"),
            metric_rejected: counter!("flexpool_tasks_rejected_total"),
            metric_wait_seconds: histogram!("flexpool_task_wait_seconds"),
            metric_execution_seconds: histogram!("flexpool_task_execution_seconds"),
            metric_queue_size: gauge!("flexpool_queue_size"),
        }
    }

    pub fn record_submission(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.metric_submitted.increment(1);
    }

    pub fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.metric_completed.increment(1);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.metric_failed.increment(1);
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.metric_rejected.increment(1);
    }

    /// Negative samples are ignored.
    pub fn record_wait_time(&self, wait_ms: i64) {
        if wait_ms < 0 {
            return;
        }
        self.total_wait_ms.fetch_add(wait_ms as u64, Ordering::Relaxed);
        self.metric_wait_seconds.record(wait_ms as f64 / 1000.0);
    }

    /// Execution samples also feed the latency histogram.
    pub fn record_execution_time(&self, execution_ms: i64) {
        if execution_ms < 0 {
            return;
        }
        self.total_execution_ms
            .fetch_add(execution_ms as u64, Ordering::Relaxed);
        self.metric_execution_seconds
            .record(execution_ms as f64 / 1000.0);
        self.record_latency(execution_ms as u64);
    }

    pub fn record_queue_time(&self, queue_ms: i64) {
        if queue_ms < 0 {
            return;
        }
        self.total_queue_ms.fetch_add(queue_ms as u64, Ordering::Relaxed);
    }

    pub fn record_queue_size(&self, size: usize) {
        self.max_queue_size.fetch_max(size as u64, Ordering::Relaxed);
        self.metric_queue_size.set(size as f64);
    }

    fn record_latency(&self, latency_ms: u64) {
        // Samples above the configured bound are dropped.
        if latency_ms > self.max_latency_ms {
            return;
        }
        let bucket = ((latency_ms as u128 * LATENCY_BUCKET_COUNT as u128)
            / self.max_latency_ms as u128) as usize;
        let bucket = bucket.min(LATENCY_BUCKET_COUNT - 1);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    pub fn latency_percentile(&self, percentile: u8) -> u64 {
        self.snapshot().latency_percentile(percentile)
    }

    pub fn all_latency_percentiles(&self) -> Vec<(u8, u64)> {
        self.snapshot().all_latency_percentiles()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn max_queue_size(&self) -> u64 {
        self.max_queue_size.load(Ordering::Relaxed)
    }

    pub fn start_time_ms(&self) -> i64 {
        self.start_time_ms
    }

    /// Point-in-time copy of every field. Individual fields are read
    /// atomically; the snapshot as a whole is not globally atomic.
    pub fn snapshot(&self) -> TaskStatsSnapshot {
        TaskStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            total_wait_ms: self.total_wait_ms.load(Ordering::Relaxed),
            total_execution_ms: self.total_execution_ms.load(Ordering::Relaxed),
            total_queue_ms: self.total_queue_ms.load(Ordering::Relaxed),
            max_queue_size: self.max_queue_size.load(Ordering::Relaxed),
            latency_buckets: self
                .latency_buckets
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect(),
            percentiles: self.percentiles.clone(),
            max_latency_ms: self.max_latency_ms,
            start_time_ms: self.start_time_ms,
        }
    }
}

impl Default for TaskStats {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_PERCENTILES.to_vec(), DEFAULT_MAX_LATENCY_MS)
    }
}
