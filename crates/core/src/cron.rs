// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring schedule definition and registration.

use crate::run::{AgentInstanceId, UserId, ValidationError};
use crate::schedule::{CronSpec, ScheduleError};
use serde::{Deserialize, Serialize};

/// A recurring schedule definition submitted by a caller.
///
/// At most one registration is active per `agent_instance_id`;
/// re-submission replaces the existing schedule rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJob {
    pub agent_instance_id: AgentInstanceId,
    /// Owner attributed to runs spawned from this schedule.
    pub user_id: UserId,
    /// Cron expression (five-field standard form or six-field with seconds)
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl CronJob {
    /// Validate the envelope fields. Schedule syntax is checked separately
    /// via [`CronJob::parse_schedule`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut fields = Vec::new();
        if self.agent_instance_id.as_str().trim().is_empty() {
            fields.push("agent_instance_id".to_string());
        }
        if self.user_id.as_str().trim().is_empty() {
            fields.push("user_id".to_string());
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }

    /// Parse the cron expression and timezone into a [`CronSpec`].
    pub fn parse_schedule(&self) -> Result<CronSpec, ScheduleError> {
        CronSpec::parse(&self.schedule, self.timezone.as_deref())
    }
}

/// Durable form of a [`CronJob`] held by the queue store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronRegistration {
    pub agent_instance_id: AgentInstanceId,
    pub user_id: UserId,
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Epoch milliseconds when this registration was (re)created.
    pub registered_at_ms: u64,
    /// Epoch milliseconds of the last fire this registration produced.
    ///
    /// Seeded to `registered_at_ms` on upsert so a fresh registration fires
    /// at its next occurrence rather than immediately.
    pub last_run_at_ms: u64,
}

impl CronRegistration {
    /// Build the durable registration for a validated cron job.
    pub fn new(job: CronJob, now_ms: u64) -> Self {
        Self {
            agent_instance_id: job.agent_instance_id,
            user_id: job.user_id,
            schedule: job.schedule,
            timezone: job.timezone,
            registered_at_ms: now_ms,
            last_run_at_ms: now_ms,
        }
    }
}

/// Handle returned by cron submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleHandle {
    pub agent_instance_id: AgentInstanceId,
    /// True when an existing registration for the instance was replaced.
    pub replaced: bool,
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
