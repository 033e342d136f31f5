// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job producer: validated, idempotent submissions into the queue store.

use crate::error::ProducerError;
use relay_adapters::{CronUpsert, EnqueueOpts, EnqueueOutcome, QueueClient, RetentionPolicy};
use relay_core::{
    BackoffPolicy, Clock, CronJob, CronRegistration, JobHandle, RunJob, ScheduleHandle,
    SystemClock,
};
use tracing::debug;

/// Retry and retention policy applied to every submitted run.
#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    /// Maximum execution attempts before a run is exhausted.
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Completed jobs are pruned young.
    pub completed_retention: RetentionPolicy,
    /// Failed jobs are retained longer for inspection.
    pub failed_retention: RetentionPolicy,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            completed_retention: RetentionPolicy::completed_default(),
            failed_retention: RetentionPolicy::failed_default(),
        }
    }
}

/// Translates validated run/cron requests into queue store submissions.
///
/// The producer's only side effect is a network write to the queue store;
/// the status store record, when required, is created by the caller around
/// submission.
#[derive(Clone)]
pub struct Producer<Q: QueueClient, C: Clock = SystemClock> {
    queue: Q,
    config: ProducerConfig,
    clock: C,
}

impl<Q: QueueClient> Producer<Q> {
    pub fn new(queue: Q, config: ProducerConfig) -> Self {
        Self::with_clock(queue, config, SystemClock)
    }
}

impl<Q: QueueClient, C: Clock> Producer<Q, C> {
    pub fn with_clock(queue: Q, config: ProducerConfig, clock: C) -> Self {
        Self {
            queue,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Submit a one-off run.
    ///
    /// Re-submission of an already-known `run_id` is a no-op that returns
    /// the existing handle with `deduplicated = true`.
    pub async fn submit_run(&self, job: RunJob) -> Result<JobHandle, ProducerError> {
        job.validate()?;

        let opts = EnqueueOpts {
            max_attempts: self.config.max_attempts,
            backoff: self.config.backoff,
            completed_retention: self.config.completed_retention,
            failed_retention: self.config.failed_retention,
        };
        let run_id = job.run_id.clone();
        let outcome = self.queue.enqueue(job, opts).await?;
        let deduplicated = outcome == EnqueueOutcome::Duplicate;
        if deduplicated {
            debug!(run_id = %run_id, "duplicate submission, returning existing handle");
        }
        Ok(JobHandle {
            run_id,
            deduplicated,
        })
    }

    /// Register or replace the recurring schedule for an agent instance.
    pub async fn submit_cron(&self, job: CronJob) -> Result<ScheduleHandle, ProducerError> {
        job.validate()?;
        job.parse_schedule()?;

        let agent_instance_id = job.agent_instance_id.clone();
        let reg = CronRegistration::new(job, self.clock.epoch_ms());
        let upsert = self.queue.upsert_cron(reg).await?;
        Ok(ScheduleHandle {
            agent_instance_id,
            replaced: upsert == CronUpsert::Replaced,
        })
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
