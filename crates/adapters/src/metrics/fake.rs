// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake metrics sink for deterministic testing

use super::MetricsSink;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded call to FakeMetricsSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricCall {
    Incr { name: String, by: u64 },
    RecordMs { name: String, ms: u64 },
}

/// Fake metrics sink that records all calls.
#[derive(Clone, Default)]
pub struct FakeMetricsSink {
    calls: Arc<Mutex<Vec<MetricCall>>>,
}

impl FakeMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<MetricCall> {
        self.calls.lock().clone()
    }

    /// Sum of increments for a named counter
    pub fn counter(&self, name: &str) -> u64 {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MetricCall::Incr { name: n, by } if n == name => Some(*by),
                _ => None,
            })
            .sum()
    }

    /// Number of duration observations for a name
    pub fn durations(&self, name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MetricCall::RecordMs { name: n, .. } if n == name))
            .count()
    }
}

impl MetricsSink for FakeMetricsSink {
    fn incr(&self, name: &str, by: u64) {
        self.calls.lock().push(MetricCall::Incr {
            name: name.to_string(),
            by,
        });
    }

    fn record_ms(&self, name: &str, ms: u64) {
        self.calls.lock().push(MetricCall::RecordMs {
            name: name.to_string(),
            ms,
        });
    }
}
