// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-engine: The scheduling and execution pipeline.
//!
//! Data flow: [`Producer`] → queue store → [`WorkerPool`] → status store
//! (+ DLQ on exhaustion). The [`CronScheduler`] feeds recurring work back
//! through the producer under a distributed lock.

pub mod debug;
pub mod error;
pub mod handler;
pub mod producer;
pub mod runs;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

pub use debug::{DebugSurface, Health};
pub use error::{ProducerError, RunServiceError};
pub use handler::{NoOpTaskHandler, TaskError, TaskHandler, TaskOutcome};
pub use producer::{Producer, ProducerConfig};
pub use runs::RunService;
pub use scheduler::{CronDuePredicate, CronScheduler, DuePredicate, SchedulerConfig, TickOutcome};
pub use shutdown::Shutdown;
pub use worker::{WorkerConfig, WorkerPool};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use handler::FakeTaskHandler;
