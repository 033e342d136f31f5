// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven scheduler for recurring work.
//!
//! On each tick the scheduler takes a named distributed lock, finds the
//! registrations that are due, and pushes one run per due fire time through
//! the producer. Across N scheduler processes at most one performs the
//! due-check per tick; a doubled tick under lock expiry is harmless because
//! fire-time-derived run ids make every submission idempotent.

use crate::producer::Producer;
use crate::shutdown::Shutdown;
use relay_adapters::{LockClient, MetricsSink, QueueClient};
use relay_core::{
    Clock, CronRegistration, CronSpec, RunId, RunJob, ScheduleError, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Upper bound on missed fires scanned per registration in one due-check.
const MAX_MISSED_SCAN: u32 = 10_000;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Named distributed lock shared by all scheduler replicas.
    pub lock_key: String,
    /// Lock TTL; slightly shorter than the tick interval.
    pub lock_ttl: Duration,
    /// Cron expression driving the tick.
    pub tick_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lock_key: "relay:scheduler:tick".to_string(),
            lock_ttl: Duration::from_secs(50),
            tick_cron: "* * * * *".to_string(),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another replica holds the lock; expected, not an error.
    Skipped,
    Ran { enqueued: u32 },
}

/// Decides whether a registration is due, and for which fire time.
///
/// Injected so the comparison of `last_run_at` to the schedule stays
/// pluggable; [`CronDuePredicate`] is the default.
pub trait DuePredicate: Send + Sync + 'static {
    /// The fire time to run for, if one is due at `now_ms`.
    fn due_fire(&self, reg: &CronRegistration, now_ms: u64) -> Result<Option<u64>, ScheduleError>;
}

/// Default due-check: the latest schedule fire strictly after `last_run_at`
/// and at or before now. Intermediate missed fires are skipped.
#[derive(Clone, Default)]
pub struct CronDuePredicate;

impl DuePredicate for CronDuePredicate {
    fn due_fire(
        &self,
        reg: &CronRegistration,
        now_ms: u64,
    ) -> Result<Option<u64>, ScheduleError> {
        let spec = CronSpec::parse(&reg.schedule, reg.timezone.as_deref())?;
        let mut due = None;
        let mut cursor = reg.last_run_at_ms;
        for _ in 0..MAX_MISSED_SCAN {
            match spec.next_fire_after(cursor) {
                Some(fire) if fire <= now_ms => {
                    due = Some(fire);
                    cursor = fire;
                }
                _ => break,
            }
        }
        Ok(due)
    }
}

/// Periodic scheduler gated by a distributed lock.
///
/// Stateless between ticks apart from the lock and best-effort metrics.
pub struct CronScheduler<Q, L, M, C = SystemClock>
where
    Q: QueueClient,
    L: LockClient,
    M: MetricsSink,
    C: Clock,
{
    queue: Q,
    lock: L,
    producer: Producer<Q, C>,
    due: Arc<dyn DuePredicate>,
    metrics: M,
    clock: C,
    config: SchedulerConfig,
}

impl<Q, L, M, C> CronScheduler<Q, L, M, C>
where
    Q: QueueClient,
    L: LockClient,
    M: MetricsSink,
    C: Clock,
{
    pub fn new(
        queue: Q,
        lock: L,
        producer: Producer<Q, C>,
        metrics: M,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            queue,
            lock,
            producer,
            due: Arc::new(CronDuePredicate),
            metrics,
            clock,
            config,
        }
    }

    /// Replace the due-check predicate.
    pub fn with_due_predicate(mut self, due: Arc<dyn DuePredicate>) -> Self {
        self.due = due;
        self
    }

    /// Perform one tick: acquire the lock, then run the due-checks.
    pub async fn tick(&self) -> TickOutcome {
        let start_ms = self.clock.epoch_ms();

        let _lease = match self
            .lock
            .acquire(&self.config.lock_key, self.config.lock_ttl)
            .await
        {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                debug!(key = %self.config.lock_key, "tick lock held elsewhere, skipping");
                self.metrics.incr("scheduler.ticks_skipped", 1);
                return TickOutcome::Skipped;
            }
            Err(e) => {
                warn!(error = %e, "tick lock acquisition failed, skipping");
                self.metrics.incr("scheduler.ticks_skipped", 1);
                return TickOutcome::Skipped;
            }
        };

        let enqueued = self.run_due_checks().await;

        // The lease is left to expire rather than released: the TTL is
        // shorter than the tick interval, so the next window re-acquires,
        // and other replicas stay locked out for the rest of this one.

        self.metrics.incr("scheduler.ticks", 1);
        self.metrics.incr("scheduler.jobs_enqueued", enqueued as u64);
        self.metrics
            .record_ms("scheduler.tick_ms", self.clock.epoch_ms() - start_ms);
        TickOutcome::Ran { enqueued }
    }

    /// Find due registrations and submit a run for each. Errors are logged
    /// and do not crash the scheduler; the next tick retries.
    async fn run_due_checks(&self) -> u32 {
        let now_ms = self.clock.epoch_ms();
        let regs = match self.queue.list_crons().await {
            Ok(regs) => regs,
            Err(e) => {
                error!(error = %e, "failed to list cron registrations");
                return 0;
            }
        };

        let mut enqueued = 0;
        for reg in regs {
            let fire_ms = match self.due.due_fire(&reg, now_ms) {
                Ok(Some(fire_ms)) => fire_ms,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        instance = %reg.agent_instance_id,
                        error = %e,
                        "skipping registration with unparseable schedule"
                    );
                    continue;
                }
            };

            // Derive the run id from instance and fire time: any replica
            // observing the same fire submits the same id.
            let job = RunJob {
                run_id: RunId::new(format!("cron-{}-{}", reg.agent_instance_id, fire_ms)),
                agent_instance_id: reg.agent_instance_id.clone(),
                user_id: reg.user_id.clone(),
                input: None,
                request_id: None,
            };

            match self.producer.submit_run(job).await {
                Ok(handle) => {
                    if !handle.deduplicated {
                        enqueued += 1;
                    }
                    if let Err(e) = self
                        .queue
                        .mark_cron_run(reg.agent_instance_id.as_str(), fire_ms)
                        .await
                    {
                        warn!(
                            instance = %reg.agent_instance_id,
                            error = %e,
                            "failed to record cron fire time"
                        );
                    }
                }
                Err(e) => {
                    error!(
                        instance = %reg.agent_instance_id,
                        error = %e,
                        "cron run submission failed"
                    );
                }
            }
        }
        enqueued
    }

    /// Tick loop driven by the configured tick cron expression.
    pub async fn run(&self, shutdown: Arc<Shutdown>) {
        let spec = match CronSpec::parse(&self.config.tick_cron, None) {
            Ok(spec) => spec,
            Err(e) => {
                error!(error = %e, "invalid tick cron expression, scheduler disabled");
                return;
            }
        };

        while !shutdown.is_signalled() {
            let now_ms = self.clock.epoch_ms();
            let Some(next_ms) = spec.next_fire_after(now_ms) else {
                error!("tick cron has no future fire time, scheduler disabled");
                return;
            };
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(next_ms.saturating_sub(now_ms))) => {
                    self.tick().await;
                }
                _ = shutdown.wait() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
