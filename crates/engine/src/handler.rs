// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque task handler invoked by the worker pool.
//!
//! The handler is the agent business logic; the pipeline treats it as an
//! executable black box that may block for an arbitrary duration.

use async_trait::async_trait;
use relay_core::RunJob;
use thiserror::Error;

/// Transient handler failure, eligible for retry.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Successful handler result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The run paused for external input. The queue entry is acknowledged;
    /// resumption is the application's concern.
    AwaitingInput,
}

/// Executes the task behind an agent run.
#[async_trait]
pub trait TaskHandler: Clone + Send + Sync + 'static {
    async fn execute(&self, job: &RunJob) -> Result<TaskOutcome, TaskError>;
}

/// Handler that acknowledges every run without doing work.
///
/// Stands in where no agent executor is wired up (e.g. a drained staging
/// deployment).
#[derive(Clone, Default)]
pub struct NoOpTaskHandler;

#[async_trait]
impl TaskHandler for NoOpTaskHandler {
    async fn execute(&self, job: &RunJob) -> Result<TaskOutcome, TaskError> {
        tracing::debug!(run_id = %job.run_id, "no-op handler completing run");
        Ok(TaskOutcome::Completed)
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTaskHandler;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{TaskError, TaskHandler, TaskOutcome};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use relay_core::RunJob;
    use std::collections::HashMap;
    use std::sync::Arc;

    enum Script {
        FailTimes { remaining: u32, message: String },
        FailAlways { message: String },
        Pause,
    }

    /// Fake task handler with scripted per-run behavior.
    ///
    /// Runs without a script succeed immediately. All executions are
    /// recorded for inspection.
    #[derive(Clone, Default)]
    pub struct FakeTaskHandler {
        scripts: Arc<Mutex<HashMap<String, Script>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeTaskHandler {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the first `times` executions of `run_id`, then succeed.
        pub fn fail_times(&self, run_id: &str, times: u32, message: &str) {
            self.scripts.lock().insert(
                run_id.to_string(),
                Script::FailTimes {
                    remaining: times,
                    message: message.to_string(),
                },
            );
        }

        /// Fail every execution of `run_id`.
        pub fn fail_always(&self, run_id: &str, message: &str) {
            self.scripts.lock().insert(
                run_id.to_string(),
                Script::FailAlways {
                    message: message.to_string(),
                },
            );
        }

        /// Pause for external input on every execution of `run_id`.
        pub fn pause(&self, run_id: &str) {
            self.scripts
                .lock()
                .insert(run_id.to_string(), Script::Pause);
        }

        /// Run ids in execution order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        /// Number of executions of a given run id.
        pub fn executions(&self, run_id: &str) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|c| c.as_str() == run_id)
                .count()
        }
    }

    #[async_trait]
    impl TaskHandler for FakeTaskHandler {
        async fn execute(&self, job: &RunJob) -> Result<TaskOutcome, TaskError> {
            let id = job.run_id.as_str().to_string();
            self.calls.lock().push(id.clone());

            let mut scripts = self.scripts.lock();
            match scripts.get_mut(&id) {
                Some(Script::FailTimes { remaining, message }) => {
                    if *remaining > 0 {
                        *remaining -= 1;
                        Err(TaskError::new(message.clone()))
                    } else {
                        Ok(TaskOutcome::Completed)
                    }
                }
                Some(Script::FailAlways { message }) => Err(TaskError::new(message.clone())),
                Some(Script::Pause) => Ok(TaskOutcome::AwaitingInput),
                None => Ok(TaskOutcome::Completed),
            }
        }
    }
}
