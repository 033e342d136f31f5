// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory queue store with full queue semantics.
//!
//! Used by tests and local development. Time comes from the injected
//! [`Clock`] so delayed redelivery and visibility timeouts can be driven
//! deterministically.

use super::{
    CronUpsert, EnqueueOpts, EnqueueOutcome, Lease, QueueClient, QueueCounts, QueueError,
    RetentionPolicy,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{Clock, CronRegistration, DlqEntry, RunId, RunJob, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// How often a blocked `lease` call re-checks for promotable work.
const LEASE_POLL: Duration = Duration::from_millis(10);

/// Default visibility timeout for leased jobs.
const DEFAULT_VISIBILITY: Duration = Duration::from_secs(30);

struct Stored {
    job: RunJob,
    opts: EnqueueOpts,
    attempts_made: u32,
}

struct ActiveLease {
    token: String,
    deadline_ms: u64,
}

#[derive(Default)]
struct Inner {
    /// Jobs currently waiting, delayed, or active.
    jobs: HashMap<String, Stored>,
    waiting: VecDeque<String>,
    /// (ready_at_ms, run_id)
    delayed: Vec<(u64, String)>,
    active: HashMap<String, ActiveLease>,
    /// (finished_at_ms, run_id), pruned per retention policy
    completed: VecDeque<(u64, String)>,
    dlq: VecDeque<DlqEntry>,
    crons: HashMap<String, CronRegistration>,
}

/// In-memory implementation of [`QueueClient`].
pub struct MemoryQueue<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    clock: C,
    visibility: Duration,
}

impl<C: Clock> Clone for MemoryQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
            clock: self.clock.clone(),
            visibility: self.visibility,
        }
    }
}

impl MemoryQueue<SystemClock> {
    /// Create a queue on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryQueue<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryQueue<C> {
    /// Create a queue on an injected clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
            clock,
            visibility: DEFAULT_VISIBILITY,
        }
    }

    /// Override the visibility timeout for leased jobs.
    pub fn with_visibility(mut self, visibility: Duration) -> Self {
        self.visibility = visibility;
        self
    }

    fn try_lease(&self, inner: &mut Inner, now_ms: u64) -> Option<Lease> {
        // Redeliver jobs whose lease expired without an ack.
        let expired: Vec<String> = inner
            .active
            .iter()
            .filter(|(_, l)| l.deadline_ms <= now_ms)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            inner.active.remove(&id);
            inner.waiting.push_front(id);
        }

        // Promote delayed jobs that are ready.
        inner.delayed.sort_by(|a, b| a.0.cmp(&b.0));
        while let Some((ready_at, _)) = inner.delayed.first() {
            if *ready_at > now_ms {
                break;
            }
            let (_, id) = inner.delayed.remove(0);
            inner.waiting.push_back(id);
        }

        let id = inner.waiting.pop_front()?;
        let stored = inner.jobs.get_mut(&id)?;
        stored.attempts_made += 1;
        let token = uuid::Uuid::new_v4().to_string();
        let lease = Lease {
            job: stored.job.clone(),
            attempt: stored.attempts_made,
            max_attempts: stored.opts.max_attempts,
            token: token.clone(),
        };
        inner.active.insert(
            id,
            ActiveLease {
                token,
                deadline_ms: now_ms + self.visibility.as_millis() as u64,
            },
        );
        Some(lease)
    }

    /// Verify the lease token still owns the job, then drop the active entry.
    fn take_active(&self, inner: &mut Inner, lease: &Lease) -> Result<(), QueueError> {
        let id = lease.job.run_id.as_str();
        let owned = matches!(inner.active.get(id), Some(a) if a.token == lease.token);
        if !owned {
            return Err(QueueError::InvalidLease(lease.job.run_id.clone()));
        }
        inner.active.remove(id);
        Ok(())
    }
}

fn prune_finished(set: &mut VecDeque<(u64, String)>, policy: RetentionPolicy, now_ms: u64) {
    while set.len() > policy.max_count {
        set.pop_front();
    }
    while let Some((at_ms, _)) = set.front() {
        if now_ms.saturating_sub(*at_ms) <= policy.max_age_ms {
            break;
        }
        set.pop_front();
    }
}

fn prune_dlq(dlq: &mut VecDeque<DlqEntry>, policy: RetentionPolicy, now_ms: u64) {
    while dlq.len() > policy.max_count {
        dlq.pop_front();
    }
    while let Some(entry) = dlq.front() {
        if now_ms.saturating_sub(entry.failed_at_ms) <= policy.max_age_ms {
            break;
        }
        dlq.pop_front();
    }
}

#[async_trait]
impl<C: Clock> QueueClient for MemoryQueue<C> {
    async fn enqueue(
        &self,
        job: RunJob,
        opts: EnqueueOpts,
    ) -> Result<EnqueueOutcome, QueueError> {
        let mut inner = self.inner.lock();
        let id = job.run_id.as_str().to_string();

        let known = inner.jobs.contains_key(&id)
            || inner.completed.iter().any(|(_, c)| *c == id)
            || inner.dlq.iter().any(|e| e.job.run_id == job.run_id);
        if known {
            return Ok(EnqueueOutcome::Duplicate);
        }

        inner.jobs.insert(
            id.clone(),
            Stored {
                job,
                opts,
                attempts_made: 0,
            },
        );
        inner.waiting.push_back(id);
        drop(inner);
        self.notify.notify_waiters();
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn lease(&self, wait: Duration) -> Result<Option<Lease>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let leased = {
                let mut inner = self.inner.lock();
                self.try_lease(&mut inner, self.clock.epoch_ms())
            };
            if let Some(lease) = leased {
                return Ok(Some(lease));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let poll = LEASE_POLL.min(deadline - now);
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }

    async fn ack(&self, lease: &Lease) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        self.take_active(&mut inner, lease)?;

        let id = lease.job.run_id.as_str().to_string();
        let retention = inner
            .jobs
            .remove(&id)
            .map(|s| s.opts.completed_retention)
            .unwrap_or_else(RetentionPolicy::completed_default);
        inner.completed.push_back((now_ms, id));
        prune_finished(&mut inner.completed, retention, now_ms);
        Ok(())
    }

    async fn retry(&self, lease: &Lease) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        self.take_active(&mut inner, lease)?;

        let id = lease.job.run_id.as_str().to_string();
        let stored = inner
            .jobs
            .get(&id)
            .ok_or_else(|| QueueError::InvalidLease(lease.job.run_id.clone()))?;
        let delay = stored.opts.backoff.delay_for(stored.attempts_made);
        inner.delayed.push((now_ms + delay.as_millis() as u64, id));
        Ok(())
    }

    async fn dead_letter(&self, lease: &Lease, entry: DlqEntry) -> Result<(), QueueError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        self.take_active(&mut inner, lease)?;

        let id = lease.job.run_id.as_str().to_string();
        let retention = inner
            .jobs
            .remove(&id)
            .map(|s| s.opts.failed_retention)
            .unwrap_or_else(RetentionPolicy::failed_default);
        inner.dlq.push_back(entry);
        prune_dlq(&mut inner.dlq, retention, now_ms);
        Ok(())
    }

    async fn remove_waiting(&self, run_id: &RunId) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock();
        let id = run_id.as_str();

        if let Some(pos) = inner.waiting.iter().position(|w| w.as_str() == id) {
            inner.waiting.remove(pos);
            inner.jobs.remove(id);
            return Ok(true);
        }
        if let Some(pos) = inner.delayed.iter().position(|(_, d)| d.as_str() == id) {
            inner.delayed.remove(pos);
            inner.jobs.remove(id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn upsert_cron(&self, reg: CronRegistration) -> Result<CronUpsert, QueueError> {
        let mut inner = self.inner.lock();
        let key = reg.agent_instance_id.as_str().to_string();
        match inner.crons.insert(key, reg) {
            Some(_) => Ok(CronUpsert::Replaced),
            None => Ok(CronUpsert::Created),
        }
    }

    async fn list_crons(&self) -> Result<Vec<CronRegistration>, QueueError> {
        let inner = self.inner.lock();
        let mut regs: Vec<CronRegistration> = inner.crons.values().cloned().collect();
        regs.sort_by(|a, b| a.agent_instance_id.as_str().cmp(b.agent_instance_id.as_str()));
        Ok(regs)
    }

    async fn mark_cron_run(
        &self,
        agent_instance_id: &str,
        at_ms: u64,
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if let Some(reg) = inner.crons.get_mut(agent_instance_id) {
            reg.last_run_at_ms = at_ms;
        }
        Ok(())
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let inner = self.inner.lock();
        Ok(QueueCounts {
            waiting: inner.waiting.len() as u64,
            delayed: inner.delayed.len() as u64,
            active: inner.active.len() as u64,
            completed: inner.completed.len() as u64,
            failed: inner.dlq.len() as u64,
        })
    }

    async fn recent_dead_letters(&self, limit: usize) -> Result<Vec<DlqEntry>, QueueError> {
        let inner = self.inner.lock();
        Ok(inner.dlq.iter().rev().take(limit).cloned().collect())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
