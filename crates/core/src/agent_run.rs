// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable run lifecycle record.
//!
//! An `AgentRun` is the status-store record for one `run_id`. It is created
//! in `Pending` by the run-start API (or ensured by a worker for
//! scheduler-spawned runs) and mutated only by the worker pool. The pipeline
//! never deletes records; retention is an external concern.

use crate::run::{AgentInstanceId, RunId, RunJob, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a run.
///
/// `Pending → Running → {Completed | Failed | Cancelled}` with
/// `AwaitingInput` as a pause state reachable from `Running`. A failed
/// attempt that still has retry budget returns `Running → Pending` while
/// redelivery is awaited; the terminal `Failed` state is reserved for
/// exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunState {
    Pending,
    Running,
    AwaitingInput,
    Completed,
    Failed,
    Cancelled,
}

impl AgentRunState {
    /// Whether this state is terminal (no further transitions expected)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentRunState::Completed | AgentRunState::Failed | AgentRunState::Cancelled
        )
    }

    /// Whether a transition from `self` to `to` is permitted.
    pub fn can_transition(&self, to: AgentRunState) -> bool {
        use AgentRunState::*;
        matches!(
            (self, to),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Pending)
                | (Running, AwaitingInput)
                | (AwaitingInput, Running)
        )
    }
}

impl fmt::Display for AgentRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRunState::Pending => write!(f, "pending"),
            AgentRunState::Running => write!(f, "running"),
            AgentRunState::AwaitingInput => write!(f, "awaiting_input"),
            AgentRunState::Completed => write!(f, "completed"),
            AgentRunState::Failed => write!(f, "failed"),
            AgentRunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: AgentRunState,
    pub to: AgentRunState,
}

/// Auxiliary observability record attached to a run (e.g. the error message
/// of a failed attempt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunNote {
    pub at_ms: u64,
    pub message: String,
}

/// Durable lifecycle record for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    pub run_id: RunId,
    pub agent_instance_id: AgentInstanceId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub state: AgentRunState,
    /// Number of execution attempts started so far.
    #[serde(default)]
    pub attempts_made: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Final error message, set on exhaustion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-attempt observability notes.
    #[serde(default)]
    pub notes: Vec<RunNote>,
}

impl AgentRun {
    /// Create a pending record for a submitted job.
    pub fn pending(job: &RunJob, now_ms: u64) -> Self {
        Self {
            run_id: job.run_id.clone(),
            agent_instance_id: job.agent_instance_id.clone(),
            user_id: job.user_id.clone(),
            request_id: job.request_id.clone(),
            state: AgentRunState::Pending,
            attempts_made: 0,
            created_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
            error: None,
            notes: Vec::new(),
        }
    }

    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a guarded state transition, stamping start/finish times.
    pub fn transition(
        &mut self,
        to: AgentRunState,
        now_ms: u64,
    ) -> Result<(), TransitionError> {
        if !self.state.can_transition(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        if to == AgentRunState::Running && self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
        if to.is_terminal() {
            self.finished_at_ms = Some(now_ms);
        }
        self.state = to;
        Ok(())
    }

    /// Append an observability note.
    pub fn push_note(&mut self, message: impl Into<String>, now_ms: u64) {
        self.notes.push(RunNote {
            at_ms: now_ms,
            message: message.into(),
        });
    }
}

#[cfg(test)]
#[path = "agent_run_tests.rs"]
mod tests;
