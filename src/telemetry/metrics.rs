//! Metrics collection for pool monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Submission counters
    tasks_enqueued: AtomicU64,
    tasks_refused: AtomicU64,
    tasks_cancelled: AtomicU64,

    // Execution counters
    tasks_executed: AtomicU64,
    tasks_helped: AtomicU64,
    tasks_panicked: AtomicU64,

    busy_time_ns: AtomicU64,

    // Task run time in nanoseconds
    run_time_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, max one hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3)
            .expect("histogram bounds are valid constants");

        Self {
            tasks_enqueued: AtomicU64::new(0),
            tasks_refused: AtomicU64::new(0),
            tasks_cancelled: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_helped: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            run_time_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    pub fn record_enqueued(&self) {
        self.tasks_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refused(&self) {
        self.tasks_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self, count: u64) {
        self.tasks_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a finished task body. `helped` marks a task run by a waiting
    /// worker rather than by the worker loop.
    pub fn record_execution(&self, duration: Duration, helped: bool) {
        let duration_ns = duration.as_nanos().min(u64::MAX as u128) as u64;
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        if helped {
            self.tasks_helped.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(mut hist) = self.run_time_histogram.try_write() {
            let _ = hist.record(duration_ns);
        }
    }

    pub fn record_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.run_time_histogram.read();

        MetricsSnapshot {
            timestamp: Instant::now(),
            uptime: self.start_time.elapsed(),
            tasks_enqueued: self.tasks_enqueued.load(Ordering::Relaxed),
            tasks_refused: self.tasks_refused.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_helped: self.tasks_helped.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_run_time_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_run_time_ns: histogram.value_at_quantile(0.50),
            p99_run_time_ns: histogram.value_at_quantile(0.99),
            max_run_time_ns: histogram.max(),
        }
    }

    pub fn reset(&self) {
        self.tasks_enqueued.store(0, Ordering::Relaxed);
        self.tasks_refused.store(0, Ordering::Relaxed);
        self.tasks_cancelled.store(0, Ordering::Relaxed);
        self.tasks_executed.store(0, Ordering::Relaxed);
        self.tasks_helped.store(0, Ordering::Relaxed);
        self.tasks_panicked.store(0, Ordering::Relaxed);
        self.busy_time_ns.store(0, Ordering::Relaxed);

        self.run_time_histogram.write().reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: Instant,
    pub uptime: Duration,
    pub tasks_enqueued: u64,
    pub tasks_refused: u64,
    pub tasks_cancelled: u64,
    pub tasks_executed: u64,
    pub tasks_helped: u64,
    pub tasks_panicked: u64,
    pub busy_time_ns: u64,
    pub avg_run_time_ns: u64,
    pub p50_run_time_ns: u64,
    pub p99_run_time_ns: u64,
    pub max_run_time_ns: u64,
}

impl MetricsSnapshot {
    /// Tasks finished per second of pool uptime.
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }
}
