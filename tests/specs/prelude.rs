// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for pipeline specs.

use relay_adapters::{FakeMetricsSink, MemoryLock, MemoryQueue};
use relay_core::{AgentRunState, CronJob, FakeClock, RunId, RunJob};
use relay_engine::{
    CronScheduler, FakeTaskHandler, Producer, ProducerConfig, RunService, SchedulerConfig,
    WorkerConfig, WorkerPool,
};
use relay_store::MemoryRunStore;
use std::time::Duration;

// Traits brought along so spec modules can call adapter methods.
pub use relay_adapters::QueueClient;
pub use relay_store::RunStore;

pub type SpecQueue = MemoryQueue<FakeClock>;
pub type SpecScheduler =
    CronScheduler<SpecQueue, MemoryLock<FakeClock>, FakeMetricsSink, FakeClock>;
pub type SpecPool =
    WorkerPool<SpecQueue, MemoryRunStore, FakeTaskHandler, FakeMetricsSink, FakeClock>;
pub type SpecService = RunService<SpecQueue, MemoryRunStore, FakeClock>;

pub const MINUTE: Duration = Duration::from_secs(60);

/// Fully wired pipeline on in-memory backends.
pub struct Pipeline {
    pub queue: SpecQueue,
    pub lock: MemoryLock<FakeClock>,
    pub store: MemoryRunStore,
    pub handler: FakeTaskHandler,
    pub metrics: FakeMetricsSink,
    pub clock: FakeClock,
}

impl Pipeline {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        Self {
            queue: MemoryQueue::with_clock(clock.clone()),
            lock: MemoryLock::with_clock(clock.clone()),
            store: MemoryRunStore::new(),
            handler: FakeTaskHandler::new(),
            metrics: FakeMetricsSink::new(),
            clock,
        }
    }

    pub fn producer(&self) -> Producer<SpecQueue, FakeClock> {
        Producer::with_clock(
            self.queue.clone(),
            ProducerConfig::default(),
            self.clock.clone(),
        )
    }

    pub fn service(&self) -> SpecService {
        RunService::new(
            self.producer(),
            self.queue.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
    }

    pub fn scheduler(&self) -> SpecScheduler {
        CronScheduler::new(
            self.queue.clone(),
            self.lock.clone(),
            self.producer(),
            self.metrics.clone(),
            self.clock.clone(),
            SchedulerConfig::default(),
        )
    }

    pub fn pool(&self) -> SpecPool {
        WorkerPool::with_clock(
            self.queue.clone(),
            self.store.clone(),
            self.handler.clone(),
            self.metrics.clone(),
            self.clock.clone(),
            WorkerConfig {
                concurrency: 2,
                max_attempts: 3,
                lease_wait: Duration::from_millis(20),
            },
        )
    }

    pub fn run_job(&self, run_id: &str) -> RunJob {
        RunJob::builder()
            .run_id(run_id)
            .agent_instance_id("a1")
            .user_id("u1")
            .build()
    }

    pub fn cron_job(&self, instance: &str, schedule: &str) -> CronJob {
        CronJob {
            agent_instance_id: instance.into(),
            user_id: "u1".into(),
            schedule: schedule.to_string(),
            timezone: None,
        }
    }

    /// Lease the next delivery and execute it on a fresh pool.
    pub async fn execute_next(&self) {
        let lease = self
            .queue
            .lease(Duration::ZERO)
            .await
            .unwrap()
            .expect("expected a deliverable job");
        self.pool().execute(lease).await;
    }

    /// Execute deliveries until the queue is idle at the current clock.
    pub async fn execute_all(&self) -> usize {
        let pool = self.pool();
        let mut executed = 0;
        while let Some(lease) = self.queue.lease(Duration::ZERO).await.unwrap() {
            pool.execute(lease).await;
            executed += 1;
        }
        executed
    }

    pub async fn state(&self, run_id: &str) -> AgentRunState {
        self.store
            .get(&RunId::new(run_id))
            .await
            .unwrap()
            .map(|r| r.state)
            .unwrap_or_else(|| panic!("no record for {run_id}"))
    }
}
