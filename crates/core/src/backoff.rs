// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential retry backoff policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with a base delay and a hard ceiling.
///
/// Delay for attempt `n` (1-based) is `base * 2^(n-1)`, capped at the
/// ceiling. Stored as milliseconds so the policy can travel with a job
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub ceiling_ms: u64,
}

impl BackoffPolicy {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            ceiling_ms: ceiling.as_millis() as u64,
        }
    }

    /// Delay before redelivering a job that has made `attempt` attempts.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let ms = self
            .base_ms
            .checked_shl(shift)
            .unwrap_or(self.ceiling_ms)
            .min(self.ceiling_ms);
        Duration::from_millis(ms)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            ceiling_ms: 300_000,
        }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
