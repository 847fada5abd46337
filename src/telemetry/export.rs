//! Metrics export.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Sink for metrics snapshots.
pub trait MetricsExporter: Send + Sync {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Writes each snapshot to a JSON file, replacing the previous one.
#[derive(Debug)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;

        std::fs::write(&self.output_path, json)?;

        Ok(())
    }
}

/// Emits each snapshot as one structured `tracing` event.
#[derive(Debug, Default)]
pub struct LogExporter;

impl MetricsExporter for LogExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        tracing::info!(
            uptime_secs = snapshot.uptime.as_secs_f64(),
            enqueued = snapshot.tasks_enqueued,
            executed = snapshot.tasks_executed,
            helped = snapshot.tasks_helped,
            cancelled = snapshot.tasks_cancelled,
            refused = snapshot.tasks_refused,
            panicked = snapshot.tasks_panicked,
            p99_run_time_us = snapshot.p99_run_time_ns as f64 / 1_000.0,
            "task pool metrics"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_enqueued: u64,
    tasks_refused: u64,
    tasks_cancelled: u64,
    tasks_executed: u64,
    tasks_helped: u64,
    tasks_panicked: u64,
    busy_time_ms: u64,
    avg_run_time_us: f64,
    p50_run_time_us: f64,
    p99_run_time_us: f64,
    max_run_time_us: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_enqueued: snapshot.tasks_enqueued,
            tasks_refused: snapshot.tasks_refused,
            tasks_cancelled: snapshot.tasks_cancelled,
            tasks_executed: snapshot.tasks_executed,
            tasks_helped: snapshot.tasks_helped,
            tasks_panicked: snapshot.tasks_panicked,
            busy_time_ms: snapshot.busy_time_ns / 1_000_000,
            avg_run_time_us: snapshot.avg_run_time_ns as f64 / 1_000.0,
            p50_run_time_us: snapshot.p50_run_time_ns as f64 / 1_000.0,
            p99_run_time_us: snapshot.p99_run_time_ns as f64 / 1_000.0,
            max_run_time_us: snapshot.max_run_time_ns as f64 / 1_000.0,
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}
