//! Pool telemetry.
//!
//! Counters and a task run-time histogram, plus exporters for snapshots.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub mod export;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

#[cfg(feature = "telemetry")]
pub use export::{JsonExporter, LogExporter, MetricsExporter};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_enqueued(&self) {}
        pub fn record_refused(&self) {}
        pub fn record_cancelled(&self, _: u64) {}
        pub fn record_execution(&self, _: Duration, _: bool) {}
        pub fn record_panic(&self) {}
        pub fn reset(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub timestamp: Option<Instant>,
        pub tasks_enqueued: u64,
        pub tasks_refused: u64,
        pub tasks_cancelled: u64,
        pub tasks_executed: u64,
        pub tasks_helped: u64,
        pub tasks_panicked: u64,
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
