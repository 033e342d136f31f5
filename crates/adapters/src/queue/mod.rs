// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue store client.
//!
//! The queue store is an external service providing atomic enqueue/dequeue,
//! per-job visibility timeouts, delayed redelivery, and simple counters.
//! This module defines the client abstraction the pipeline is written
//! against; `MemoryQueue` implements the full semantics in process (tests,
//! local development) and `RedisQueue` speaks to a shared redis backend.

mod memory;
mod redis;

pub use self::redis::RedisQueue;
pub use memory::MemoryQueue;

use async_trait::async_trait;
use relay_core::{BackoffPolicy, CronRegistration, DlqEntry, RunId, RunJob};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from queue store operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue store unreachable: {0}")]
    Connectivity(String),
    #[error("serialization: {0}")]
    Serde(String),
    #[error("lease no longer valid for run {0}")]
    InvalidLease(RunId),
}

/// Bounded retention for finished jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of records kept.
    pub max_count: usize,
    /// Maximum record age in milliseconds.
    pub max_age_ms: u64,
}

impl RetentionPolicy {
    /// Default retention for completed jobs: pruned young.
    pub fn completed_default() -> Self {
        Self {
            max_count: 1_000,
            max_age_ms: 3_600_000, // 1 hour
        }
    }

    /// Default retention for dead-lettered jobs: retained longer for
    /// inspection.
    pub fn failed_default() -> Self {
        Self {
            max_count: 10_000,
            max_age_ms: 7 * 24 * 3_600_000, // 7 days
        }
    }
}

/// Per-job policies fixed at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueOpts {
    /// Maximum execution attempts before the job is exhausted.
    pub max_attempts: u32,
    /// Redelivery backoff applied between failed attempts.
    pub backoff: BackoffPolicy,
    pub completed_retention: RetentionPolicy,
    pub failed_retention: RetentionPolicy,
}

impl Default for EnqueueOpts {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            completed_retention: RetentionPolicy::completed_default(),
            failed_retention: RetentionPolicy::failed_default(),
        }
    }
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// The `run_id` is already known to the queue; no work was created.
    Duplicate,
}

/// Result of a cron registration upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronUpsert {
    Created,
    /// An existing registration for the instance was replaced.
    Replaced,
}

/// Temporary exclusive ownership of a queued job.
///
/// Granted to one worker at a time; an unacknowledged lease becomes
/// eligible for redelivery once its visibility timeout elapses.
#[derive(Debug, Clone)]
pub struct Lease {
    pub job: RunJob,
    /// 1-based count of attempts made, including this one.
    pub attempt: u32,
    /// Maximum attempts fixed at enqueue time.
    pub max_attempts: u32,
    /// Opaque token tying ack/retry/dead-letter calls to this lease.
    pub token: String,
}

/// Queue depth by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub delayed: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Client for the durable queue store.
#[async_trait]
pub trait QueueClient: Clone + Send + Sync + 'static {
    /// Enqueue a job, idempotent on `run_id`.
    async fn enqueue(&self, job: RunJob, opts: EnqueueOpts)
        -> Result<EnqueueOutcome, QueueError>;

    /// Lease the next available job, waiting up to `wait` for one to appear.
    async fn lease(&self, wait: Duration) -> Result<Option<Lease>, QueueError>;

    /// Acknowledge successful completion of a leased job.
    async fn ack(&self, lease: &Lease) -> Result<(), QueueError>;

    /// Schedule a failed attempt for redelivery using the backoff policy
    /// fixed at enqueue time. Retries of one job are strictly sequential.
    async fn retry(&self, lease: &Lease) -> Result<(), QueueError>;

    /// Terminally fail a leased job: remove it and append the DLQ entry.
    async fn dead_letter(&self, lease: &Lease, entry: DlqEntry) -> Result<(), QueueError>;

    /// Remove a job that is still queued (waiting or delayed). Returns
    /// false if the job is unknown or currently leased.
    async fn remove_waiting(&self, run_id: &RunId) -> Result<bool, QueueError>;

    /// Register or replace the recurring schedule for an agent instance.
    async fn upsert_cron(&self, reg: CronRegistration) -> Result<CronUpsert, QueueError>;

    /// All current cron registrations.
    async fn list_crons(&self) -> Result<Vec<CronRegistration>, QueueError>;

    /// Record the fire time of a cron registration.
    async fn mark_cron_run(&self, agent_instance_id: &str, at_ms: u64)
        -> Result<(), QueueError>;

    /// Queue depth by state.
    async fn counts(&self) -> Result<QueueCounts, QueueError>;

    /// Most recent dead-letter entries, newest first.
    async fn recent_dead_letters(&self, limit: usize) -> Result<Vec<DlqEntry>, QueueError>;

    /// Connectivity check.
    async fn ping(&self) -> Result<(), QueueError>;
}
