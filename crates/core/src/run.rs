// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run request envelope and submission handle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a single run. Primary de-duplication key:
    /// enqueueing the same `RunId` twice never creates a second unit of work.
    pub struct RunId;
}

crate::define_id! {
    /// Identifies the agent definition/config a run executes.
    pub struct AgentInstanceId;
}

crate::define_id! {
    /// Owner of a run, used for attribution.
    pub struct UserId;
}

/// Maximum length accepted for any envelope identifier.
pub const MAX_ID_LEN: usize = 128;

/// Validation failure listing every offending envelope field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fields: {}", fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

/// A one-off unit of work.
///
/// Only the envelope fields are validated strictly. `input` is an opaque
/// JSON value whose contract belongs to the task handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunJob {
    pub run_id: RunId,
    pub agent_instance_id: AgentInstanceId,
    pub user_id: UserId,
    /// Task parameters, interpreted by the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Correlation id for tracing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RunJob {
    /// Validate the envelope. Collects all offending fields rather than
    /// failing on the first one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut fields = Vec::new();
        if !id_ok(self.run_id.as_str()) {
            fields.push("run_id".to_string());
        }
        if !id_ok(self.agent_instance_id.as_str()) {
            fields.push("agent_instance_id".to_string());
        }
        if !id_ok(self.user_id.as_str()) {
            fields.push("user_id".to_string());
        }
        if let Some(request_id) = &self.request_id {
            if !id_ok(request_id) {
                fields.push("request_id".to_string());
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }
}

fn id_ok(s: &str) -> bool {
    !s.trim().is_empty() && s.len() <= MAX_ID_LEN
}

/// Handle returned by run submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub run_id: RunId,
    /// True when the submission matched an already-enqueued `run_id`
    /// and no new work was created.
    pub deduplicated: bool,
}

/// Builder for `RunJob` with test defaults.
#[cfg(any(test, feature = "test-support"))]
pub struct RunJobBuilder {
    run_id: String,
    agent_instance_id: String,
    user_id: String,
    input: Option<serde_json::Value>,
    request_id: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for RunJobBuilder {
    fn default() -> Self {
        Self {
            run_id: "run-1".to_string(),
            agent_instance_id: "agent-1".to_string(),
            user_id: "user-1".to_string(),
            input: None,
            request_id: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RunJobBuilder {
    pub fn run_id(mut self, v: impl Into<String>) -> Self {
        self.run_id = v.into();
        self
    }
    pub fn agent_instance_id(mut self, v: impl Into<String>) -> Self {
        self.agent_instance_id = v.into();
        self
    }
    pub fn user_id(mut self, v: impl Into<String>) -> Self {
        self.user_id = v.into();
        self
    }
    pub fn input(mut self, v: serde_json::Value) -> Self {
        self.input = Some(v);
        self
    }
    pub fn request_id(mut self, v: impl Into<String>) -> Self {
        self.request_id = Some(v.into());
        self
    }
    pub fn build(self) -> RunJob {
        RunJob {
            run_id: RunId::new(self.run_id),
            agent_instance_id: AgentInstanceId::new(self.agent_instance_id),
            user_id: UserId::new(self.user_id),
            input: self.input,
            request_id: self.request_id,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RunJob {
    /// Create a builder with test defaults.
    pub fn builder() -> RunJobBuilder {
        RunJobBuilder::default()
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
