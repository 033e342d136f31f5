// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pipeline surface.

use relay_adapters::QueueError;
use relay_core::{AgentRunState, RunId, ScheduleError, ValidationError};
use relay_store::StoreError;
use thiserror::Error;

/// Errors surfaced synchronously to a submitting caller.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Malformed envelope; never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Invalid recurring schedule; never retried.
    #[error("invalid schedule: {0}")]
    Scheduling(#[from] ScheduleError),
    /// Queue store unreachable; the caller owns the retry decision.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Errors from the run service (status read, cancel, submission).
#[derive(Debug, Error)]
pub enum RunServiceError {
    #[error("run not found: {0}")]
    NotFound(RunId),
    #[error("run {run_id} is {state}; only pending runs can be cancelled")]
    Conflict { run_id: RunId, state: AgentRunState },
    #[error(transparent)]
    Producer(#[from] ProducerError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
