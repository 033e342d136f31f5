// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: bounded-concurrency execution of leased jobs.
//!
//! Each worker process runs one pool. Executions are independent; the only
//! coordination between worker processes is the queue store's lease
//! exclusivity. The status write for a `run_id` is only ever performed by
//! the execution owning its lease.

use crate::handler::{TaskHandler, TaskOutcome};
use crate::shutdown::Shutdown;
use relay_adapters::{Lease, MetricsSink, QueueClient};
use relay_core::{AgentRun, AgentRunState, Clock, DlqEntry, SystemClock};
use relay_store::{RunStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Pause after a queue connectivity error before leasing again.
const LEASE_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Worker pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of jobs executed in parallel by this process.
    pub concurrency: usize,
    /// Maximum execution attempts; must match or exceed the producer's so
    /// the exhaustion check is consistent.
    pub max_attempts: u32,
    /// How long one lease call blocks before re-checking for shutdown.
    pub lease_wait: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            lease_wait: Duration::from_secs(5),
        }
    }
}

/// Executes leased jobs, tracks lifecycle, retries transient failures, and
/// dead-letters exhausted ones.
#[derive(Clone)]
pub struct WorkerPool<Q, S, H, M, C = SystemClock>
where
    Q: QueueClient,
    S: RunStore,
    H: TaskHandler,
    M: MetricsSink,
    C: Clock,
{
    queue: Q,
    store: S,
    handler: H,
    metrics: M,
    clock: C,
    config: WorkerConfig,
}

impl<Q, S, H, M> WorkerPool<Q, S, H, M>
where
    Q: QueueClient,
    S: RunStore,
    H: TaskHandler,
    M: MetricsSink,
{
    pub fn new(queue: Q, store: S, handler: H, metrics: M, config: WorkerConfig) -> Self {
        Self::with_clock(queue, store, handler, metrics, SystemClock, config)
    }
}

impl<Q, S, H, M, C> WorkerPool<Q, S, H, M, C>
where
    Q: QueueClient,
    S: RunStore,
    H: TaskHandler,
    M: MetricsSink,
    C: Clock,
{
    pub fn with_clock(
        queue: Q,
        store: S,
        handler: H,
        metrics: M,
        clock: C,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            store,
            handler,
            metrics,
            clock,
            config,
        }
    }

    /// Lease-and-execute loop. On shutdown, stops leasing and drains
    /// in-flight executions before returning.
    pub async fn run(&self, shutdown: Arc<Shutdown>) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut inflight: JoinSet<()> = JoinSet::new();

        while !shutdown.is_signalled() {
            // Opportunistically reap finished executions.
            while inflight.try_join_next().is_some() {}

            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.wait() => break,
            };

            let leased = tokio::select! {
                leased = self.queue.lease(self.config.lease_wait) => leased,
                _ = shutdown.wait() => break,
            };

            match leased {
                Ok(Some(lease)) => {
                    let pool = self.clone();
                    inflight.spawn(async move {
                        pool.execute(lease).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    // Idle; loop re-checks shutdown.
                }
                Err(e) => {
                    error!(error = %e, "lease failed");
                    tokio::time::sleep(LEASE_ERROR_BACKOFF).await;
                }
            }
        }

        info!("worker pool draining in-flight executions");
        while inflight.join_next().await.is_some() {}
        info!("worker pool stopped");
    }

    /// Execute one leased job through its lifecycle.
    pub async fn execute(&self, lease: Lease) {
        let run_id = lease.job.run_id.clone();

        // Scheduler-spawned runs have no pre-created record; ensure one.
        let pending = AgentRun::pending(&lease.job, self.clock.epoch_ms());
        if let Err(e) = self.store.create_if_absent(pending).await {
            self.fail_attempt(&lease, format!("status store: {e}")).await;
            return;
        }

        match self
            .store
            .transition(&run_id, AgentRunState::Running, self.clock.epoch_ms())
            .await
        {
            Ok(_) => {}
            Err(StoreError::InvalidTransition(e)) => {
                // The record is not pending (e.g. a terminal duplicate from
                // a violated lease). Drop the delivery without executing.
                warn!(run_id = %run_id, error = %e, "lease for non-pending run, dropping");
                if let Err(e) = self.queue.ack(&lease).await {
                    error!(run_id = %run_id, error = %e, "failed to ack dropped lease");
                }
                return;
            }
            Err(e) => {
                self.fail_attempt(&lease, format!("status store: {e}")).await;
                return;
            }
        }

        let started_ms = self.clock.epoch_ms();
        let result = self.handler.execute(&lease.job).await;
        self.metrics
            .record_ms("worker.execute_ms", self.clock.epoch_ms() - started_ms);

        match result {
            Ok(TaskOutcome::Completed) => {
                let now_ms = self.clock.epoch_ms();
                if let Err(e) = self
                    .store
                    .transition(&run_id, AgentRunState::Completed, now_ms)
                    .await
                {
                    error!(run_id = %run_id, error = %e, "failed to record completion");
                }
                if let Err(e) = self.queue.ack(&lease).await {
                    error!(run_id = %run_id, error = %e, "ack failed, job may redeliver");
                }
                self.metrics.incr("worker.completed", 1);
            }
            Ok(TaskOutcome::AwaitingInput) => {
                let now_ms = self.clock.epoch_ms();
                if let Err(e) = self
                    .store
                    .transition(&run_id, AgentRunState::AwaitingInput, now_ms)
                    .await
                {
                    error!(run_id = %run_id, error = %e, "failed to record pause");
                }
                if let Err(e) = self.queue.ack(&lease).await {
                    error!(run_id = %run_id, error = %e, "ack failed, job may redeliver");
                }
                self.metrics.incr("worker.paused", 1);
            }
            Err(task_err) => {
                self.fail_attempt(&lease, task_err.0).await;
            }
        }
    }

    /// Handle a failed attempt: retry with backoff, or dead-letter when the
    /// attempt count reaches the maximum. The attempt-count check (not a
    /// mutable flag) is what keeps the DLQ write exactly-once.
    async fn fail_attempt(&self, lease: &Lease, error: String) {
        let run_id = &lease.job.run_id;
        let now_ms = self.clock.epoch_ms();

        if let Err(e) = self
            .store
            .append_note(
                run_id,
                &format!("attempt {} failed: {error}", lease.attempt),
                now_ms,
            )
            .await
        {
            warn!(run_id = %run_id, error = %e, "failed to record attempt note");
        }

        if lease.attempt >= self.config.max_attempts {
            if let Err(e) = self.store.set_error(run_id, &error).await {
                error!(run_id = %run_id, error = %e, "failed to record final error");
            }
            if let Err(e) = self
                .store
                .transition(run_id, AgentRunState::Failed, now_ms)
                .await
            {
                error!(run_id = %run_id, error = %e, "failed to record exhaustion");
            }
            let entry = DlqEntry {
                job: lease.job.clone(),
                attempts_made: lease.attempt,
                failed_at_ms: now_ms,
                last_error: error,
            };
            if let Err(e) = self.queue.dead_letter(lease, entry).await {
                error!(run_id = %run_id, error = %e, "dead-letter failed");
            }
            self.metrics.incr("worker.dead_lettered", 1);
        } else {
            // Back to pending while redelivery is awaited.
            if let Err(e) = self
                .store
                .transition(run_id, AgentRunState::Pending, now_ms)
                .await
            {
                error!(run_id = %run_id, error = %e, "failed to record retry state");
            }
            if let Err(e) = self.queue.retry(lease).await {
                error!(run_id = %run_id, error = %e, "retry scheduling failed");
            }
            self.metrics.incr("worker.retried", 1);
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
