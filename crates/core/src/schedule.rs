// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed cron schedule with optional timezone.

use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a recurring schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// A validated cron expression plus optional timezone.
///
/// Accepts standard five-field expressions (`m h dom mon dow`) by
/// normalizing them with a leading `0` seconds field; six- and seven-field
/// expressions pass through unchanged.
#[derive(Debug, Clone)]
pub struct CronSpec {
    expr: String,
    schedule: Schedule,
    tz: Option<chrono_tz::Tz>,
}

impl CronSpec {
    /// Parse and validate a cron expression and optional timezone name.
    pub fn parse(expr: &str, timezone: Option<&str>) -> Result<Self, ScheduleError> {
        let normalized = normalize(expr);
        let schedule =
            Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCron {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
        let tz = match timezone {
            Some(name) => Some(
                name.parse::<chrono_tz::Tz>()
                    .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            expr: expr.to_string(),
            schedule,
            tz,
        })
    }

    /// The original (un-normalized) expression.
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// Next fire time strictly after `after_ms`, in epoch milliseconds.
    ///
    /// Returns `None` if the schedule has no future occurrence or the
    /// timestamp is out of range.
    pub fn next_fire_after(&self, after_ms: u64) -> Option<u64> {
        let after: DateTime<Utc> = Utc.timestamp_millis_opt(after_ms as i64).single()?;
        let next = match self.tz {
            Some(tz) => self
                .schedule
                .after(&after.with_timezone(&tz))
                .next()
                .map(|dt| dt.with_timezone(&Utc)),
            None => self.schedule.after(&after).next(),
        }?;
        u64::try_from(next.timestamp_millis()).ok()
    }
}

/// Prepend a seconds field to standard five-field expressions.
fn normalize(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr.trim())
    } else {
        expr.trim().to_string()
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
