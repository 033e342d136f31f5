// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort metrics side channel.
//!
//! Counters and durations recorded here must never fail the operation that
//! records them; error swallowing is confined to the sink implementations.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMetricsSink, MetricCall};

/// Fire-and-forget sink for operational counters.
pub trait MetricsSink: Clone + Send + Sync + 'static {
    /// Increment a named counter.
    fn incr(&self, name: &str, by: u64);

    /// Record a duration observation in milliseconds.
    fn record_ms(&self, name: &str, ms: u64);
}

/// Sink that drops everything.
#[derive(Clone, Default)]
pub struct NoOpMetricsSink;

impl MetricsSink for NoOpMetricsSink {
    fn incr(&self, _name: &str, _by: u64) {}
    fn record_ms(&self, _name: &str, _ms: u64) {}
}

/// Sink that emits metrics as tracing debug events.
#[derive(Clone, Default)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn incr(&self, name: &str, by: u64) {
        tracing::debug!(counter = name, by, "metric");
    }

    fn record_ms(&self, name: &str, ms: u64) {
        tracing::debug!(duration = name, ms, "metric");
    }
}
