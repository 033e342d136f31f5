// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external coordination backends.
//!
//! The pipeline talks to two shared mutable resources: the queue store and
//! the status store. This crate holds the client abstractions for the queue
//! store side (durable queue, distributed lock) plus the best-effort metrics
//! sink, each with a real backend and an in-memory implementation.

pub mod lock;
pub mod metrics;
pub mod queue;

pub use lock::{LockClient, LockError, LockLease, MemoryLock, RedisLock};
pub use metrics::{LogMetricsSink, MetricsSink, NoOpMetricsSink};
pub use queue::{
    CronUpsert, EnqueueOpts, EnqueueOutcome, Lease, MemoryQueue, QueueClient, QueueCounts,
    QueueError, RedisQueue, RetentionPolicy,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use metrics::{FakeMetricsSink, MetricCall};
