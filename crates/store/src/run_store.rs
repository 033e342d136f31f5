// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status store abstraction.

use async_trait::async_trait;
use relay_core::{AgentRun, AgentRunState, RunId, TransitionError};
use thiserror::Error;

/// Errors from status store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    NotFound(RunId),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("status store unreachable: {0}")]
    Connectivity(String),
}

/// Result of creating a run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record for the `run_id` already exists; it is returned unchanged.
    Existing(AgentRun),
}

/// Client for the durable run status store.
///
/// Single-record operations are atomic; the store guards state transitions
/// so a stale writer cannot regress a record.
#[async_trait]
pub trait RunStore: Clone + Send + Sync + 'static {
    /// Create the record if no record exists for its `run_id`.
    async fn create_if_absent(&self, run: AgentRun) -> Result<CreateOutcome, StoreError>;

    /// Fetch a record by run id.
    async fn get(&self, run_id: &RunId) -> Result<Option<AgentRun>, StoreError>;

    /// Apply a guarded state transition, stamping timestamps and bumping
    /// the attempt counter when entering `Running`.
    async fn transition(
        &self,
        run_id: &RunId,
        to: AgentRunState,
        now_ms: u64,
    ) -> Result<AgentRun, StoreError>;

    /// Set the terminal error message on a record.
    async fn set_error(&self, run_id: &RunId, error: &str) -> Result<(), StoreError>;

    /// Append an observability note to a record (per-attempt errors).
    async fn append_note(&self, run_id: &RunId, message: &str, now_ms: u64)
        -> Result<(), StoreError>;
}
