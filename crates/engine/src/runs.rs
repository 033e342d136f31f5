// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-start API: submission, status read, cancellation.
//!
//! Owner authorization is delegated to the surrounding application layer;
//! this service enforces lifecycle rules only.

use crate::error::RunServiceError;
use crate::producer::Producer;
use relay_adapters::QueueClient;
use relay_core::{AgentRun, AgentRunState, Clock, JobHandle, RunId, RunJob, SystemClock};
use relay_store::{RunStore, StoreError};
use tracing::info;

/// External interface of the pipeline for one-off runs.
#[derive(Clone)]
pub struct RunService<Q, S, C = SystemClock>
where
    Q: QueueClient,
    S: RunStore,
    C: Clock,
{
    producer: Producer<Q, C>,
    queue: Q,
    store: S,
    clock: C,
}

impl<Q, S, C> RunService<Q, S, C>
where
    Q: QueueClient,
    S: RunStore,
    C: Clock,
{
    pub fn new(producer: Producer<Q, C>, queue: Q, store: S, clock: C) -> Self {
        Self {
            producer,
            queue,
            store,
            clock,
        }
    }

    /// Submit a run: create the pending status record, then enqueue.
    ///
    /// Idempotent end to end; a duplicate `run_id` leaves the existing
    /// record untouched and returns `deduplicated = true`.
    pub async fn submit(&self, job: RunJob) -> Result<JobHandle, RunServiceError> {
        job.validate().map_err(crate::error::ProducerError::from)?;

        let pending = AgentRun::pending(&job, self.clock.epoch_ms());
        self.store.create_if_absent(pending).await?;
        let handle = self.producer.submit_run(job).await?;
        Ok(handle)
    }

    /// Current status record for a run.
    pub async fn status(&self, run_id: &RunId) -> Result<AgentRun, RunServiceError> {
        self.store
            .get(run_id)
            .await?
            .ok_or_else(|| RunServiceError::NotFound(run_id.clone()))
    }

    /// Cancel a run that is still queued.
    ///
    /// Only `Pending` runs can be cancelled; a run that started executing
    /// is a conflict (cooperative mid-execution cancellation is a
    /// non-goal).
    pub async fn cancel(&self, run_id: &RunId) -> Result<(), RunServiceError> {
        let run = self.status(run_id).await?;
        if run.state != AgentRunState::Pending {
            return Err(RunServiceError::Conflict {
                run_id: run_id.clone(),
                state: run.state,
            });
        }

        // Remove from the queue first; failure means a worker grabbed the
        // lease between the status read and now.
        let removed = self.queue.remove_waiting(run_id).await?;
        if !removed {
            return Err(RunServiceError::Conflict {
                run_id: run_id.clone(),
                state: AgentRunState::Running,
            });
        }

        match self
            .store
            .transition(run_id, AgentRunState::Cancelled, self.clock.epoch_ms())
            .await
        {
            Ok(_) => {
                info!(run_id = %run_id, "run cancelled");
                Ok(())
            }
            Err(StoreError::InvalidTransition(e)) => Err(RunServiceError::Conflict {
                run_id: run_id.clone(),
                state: e.from,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
