// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only introspection surface for operators.

use relay_adapters::{QueueClient, QueueCounts, QueueError};
use relay_core::DlqEntry;
use serde::{Deserialize, Serialize};

/// Aggregate pipeline health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Whether the queue store answered a connectivity check.
    pub queue_ok: bool,
}

/// Read-only view over the queue store. No mutation capability.
#[derive(Clone)]
pub struct DebugSurface<Q: QueueClient> {
    queue: Q,
}

impl<Q: QueueClient> DebugSurface<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Queue depth by state.
    pub async fn queue_depth(&self) -> Result<QueueCounts, QueueError> {
        self.queue.counts().await
    }

    /// Recently dead-lettered jobs, newest first.
    pub async fn recent_failures(&self, limit: usize) -> Result<Vec<DlqEntry>, QueueError> {
        self.queue.recent_dead_letters(limit).await
    }

    /// Connectivity check against the queue store.
    pub async fn health(&self) -> Health {
        Health {
            queue_ok: self.queue.ping().await.is_ok(),
        }
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
