// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed queue store client.
//!
//! Key layout under the configured namespace prefix:
//!
//! ```text
//! {ns}:job:{run_id}   job record (JSON: payload + policies + attempts)
//! {ns}:dedup:{run_id} de-duplication marker, expires with the retention window
//! {ns}:waiting        list of run_ids ready for lease
//! {ns}:delayed        zset run_id -> ready_at_ms
//! {ns}:active         zset run_id -> lease deadline_ms
//! {ns}:leases         hash run_id -> lease token
//! {ns}:completed      zset run_id -> finished_at_ms
//! {ns}:dlq            list of DLQ entries (JSON), newest first
//! {ns}:crons          hash agent_instance_id -> registration (JSON)
//! ```

use super::{
    CronUpsert, EnqueueOpts, EnqueueOutcome, Lease, QueueClient, QueueCounts, QueueError,
};
use async_trait::async_trait;
use relay_core::{CronRegistration, DlqEntry, RunId, RunJob};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How often a blocked `lease` call polls the backend.
const LEASE_POLL: Duration = Duration::from_millis(100);

/// Visibility timeout for leased jobs.
const VISIBILITY_MS: u64 = 30_000;

/// Durable job record stored at `{ns}:job:{run_id}`.
#[derive(Debug, Serialize, Deserialize)]
struct Stored {
    job: RunJob,
    opts: EnqueueOpts,
    attempts_made: u32,
}

/// Redis implementation of [`QueueClient`].
#[derive(Clone)]
pub struct RedisQueue {
    client: Arc<redis::Client>,
    ns: String,
}

impl RedisQueue {
    /// Connect to the given redis URL with a key namespace prefix.
    pub fn new(url: impl AsRef<str>, namespace: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(url.as_ref())
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            ns: namespace.into(),
        })
    }

    fn conn(&self) -> Result<redis::Connection, QueueError> {
        self.client
            .get_connection()
            .map_err(|e| QueueError::Connectivity(e.to_string()))
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.ns, suffix)
    }

    fn job_key(&self, run_id: &str) -> String {
        self.key(&format!("job:{run_id}"))
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn read_job(&self, conn: &mut redis::Connection, run_id: &str) -> Result<Stored, QueueError> {
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.job_key(run_id))
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let raw = raw.ok_or_else(|| QueueError::InvalidLease(RunId::new(run_id)))?;
        serde_json::from_str(&raw).map_err(|e| QueueError::Serde(e.to_string()))
    }

    fn write_job(
        &self,
        conn: &mut redis::Connection,
        stored: &Stored,
    ) -> Result<(), QueueError> {
        let raw = serde_json::to_string(stored).map_err(|e| QueueError::Serde(e.to_string()))?;
        let _: () = redis::cmd("SET")
            .arg(self.job_key(stored.job.run_id.as_str()))
            .arg(raw)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    /// Move due delayed jobs to waiting and redeliver expired leases.
    fn promote(&self, conn: &mut redis::Connection, now_ms: u64) -> Result<(), QueueError> {
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.key("delayed"))
            .arg(0)
            .arg(now_ms)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        for id in due {
            let _: i64 = redis::cmd("ZREM")
                .arg(self.key("delayed"))
                .arg(&id)
                .query(conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
            let _: i64 = redis::cmd("RPUSH")
                .arg(self.key("waiting"))
                .arg(&id)
                .query(conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        }

        let expired: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.key("active"))
            .arg(0)
            .arg(now_ms)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        for id in expired {
            let _: i64 = redis::cmd("ZREM")
                .arg(self.key("active"))
                .arg(&id)
                .query(conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
            let _: i64 = redis::cmd("HDEL")
                .arg(self.key("leases"))
                .arg(&id)
                .query(conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
            let _: i64 = redis::cmd("LPUSH")
                .arg(self.key("waiting"))
                .arg(&id)
                .query(conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        }
        Ok(())
    }

    /// Verify the lease token still owns the job, then drop the lease.
    fn take_active(
        &self,
        conn: &mut redis::Connection,
        lease: &Lease,
    ) -> Result<(), QueueError> {
        let id = lease.job.run_id.as_str();
        let current: Option<String> = redis::cmd("HGET")
            .arg(self.key("leases"))
            .arg(id)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        if current.as_deref() != Some(lease.token.as_str()) {
            return Err(QueueError::InvalidLease(lease.job.run_id.clone()));
        }
        let _: i64 = redis::cmd("ZREM")
            .arg(self.key("active"))
            .arg(id)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let _: i64 = redis::cmd("HDEL")
            .arg(self.key("leases"))
            .arg(id)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    fn try_lease(&self, conn: &mut redis::Connection) -> Result<Option<Lease>, QueueError> {
        let now_ms = Self::now_ms();
        self.promote(conn, now_ms)?;

        let id: Option<String> = redis::cmd("LPOP")
            .arg(self.key("waiting"))
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let Some(id) = id else {
            return Ok(None);
        };

        let mut stored = self.read_job(conn, &id)?;
        stored.attempts_made += 1;
        self.write_job(conn, &stored)?;

        let token = uuid::Uuid::new_v4().to_string();
        let _: i64 = redis::cmd("ZADD")
            .arg(self.key("active"))
            .arg(now_ms + VISIBILITY_MS)
            .arg(&id)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let _: i64 = redis::cmd("HSET")
            .arg(self.key("leases"))
            .arg(&id)
            .arg(&token)
            .query(conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;

        Ok(Some(Lease {
            job: stored.job,
            attempt: stored.attempts_made,
            max_attempts: stored.opts.max_attempts,
            token,
        }))
    }
}

#[async_trait]
impl QueueClient for RedisQueue {
    async fn enqueue(
        &self,
        job: RunJob,
        opts: EnqueueOpts,
    ) -> Result<EnqueueOutcome, QueueError> {
        let mut conn = self.conn()?;
        let id = job.run_id.as_str().to_string();

        // De-duplication marker lives for the failed-retention window, the
        // longest period a finished run_id stays observable.
        let marker: Option<String> = redis::cmd("SET")
            .arg(self.key(&format!("dedup:{id}")))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(opts.failed_retention.max_age_ms)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        if marker.is_none() {
            return Ok(EnqueueOutcome::Duplicate);
        }

        self.write_job(
            &mut conn,
            &Stored {
                job,
                opts,
                attempts_made: 0,
            },
        )?;
        let _: i64 = redis::cmd("RPUSH")
            .arg(self.key("waiting"))
            .arg(&id)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn lease(&self, wait: Duration) -> Result<Option<Lease>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let mut conn = self.conn()?;
            if let Some(lease) = self.try_lease(&mut conn)? {
                return Ok(Some(lease));
            }
            drop(conn);

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(LEASE_POLL.min(deadline - now)).await;
        }
    }

    async fn ack(&self, lease: &Lease) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        self.take_active(&mut conn, lease)?;

        let id = lease.job.run_id.as_str();
        let stored = self.read_job(&mut conn, id)?;
        let retention = stored.opts.completed_retention;
        let now_ms = Self::now_ms();

        let _: i64 = redis::cmd("DEL")
            .arg(self.job_key(id))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let _: i64 = redis::cmd("ZADD")
            .arg(self.key("completed"))
            .arg(now_ms)
            .arg(id)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;

        // Prune by age, then by count (keep the newest max_count).
        let _: i64 = redis::cmd("ZREMRANGEBYSCORE")
            .arg(self.key("completed"))
            .arg(0)
            .arg(now_ms.saturating_sub(retention.max_age_ms))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let _: i64 = redis::cmd("ZREMRANGEBYRANK")
            .arg(self.key("completed"))
            .arg(0)
            .arg(-(retention.max_count as i64 + 1))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn retry(&self, lease: &Lease) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        self.take_active(&mut conn, lease)?;

        let id = lease.job.run_id.as_str();
        let stored = self.read_job(&mut conn, id)?;
        let delay = stored.opts.backoff.delay_for(stored.attempts_made);
        let _: i64 = redis::cmd("ZADD")
            .arg(self.key("delayed"))
            .arg(Self::now_ms() + delay.as_millis() as u64)
            .arg(id)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn dead_letter(&self, lease: &Lease, entry: DlqEntry) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        self.take_active(&mut conn, lease)?;

        let id = lease.job.run_id.as_str();
        let stored = self.read_job(&mut conn, id)?;
        let retention = stored.opts.failed_retention;
        let raw = serde_json::to_string(&entry).map_err(|e| QueueError::Serde(e.to_string()))?;

        let _: i64 = redis::cmd("DEL")
            .arg(self.job_key(id))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(self.key("dlq"))
            .arg(raw)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        // Newest-first list; trim to the retention count.
        let _: () = redis::cmd("LTRIM")
            .arg(self.key("dlq"))
            .arg(0)
            .arg(retention.max_count as i64 - 1)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn remove_waiting(&self, run_id: &RunId) -> Result<bool, QueueError> {
        let mut conn = self.conn()?;
        let id = run_id.as_str();

        let removed: i64 = redis::cmd("LREM")
            .arg(self.key("waiting"))
            .arg(0)
            .arg(id)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let removed = if removed > 0 {
            true
        } else {
            let zremoved: i64 = redis::cmd("ZREM")
                .arg(self.key("delayed"))
                .arg(id)
                .query(&mut conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
            zremoved > 0
        };

        if removed {
            let _: i64 = redis::cmd("DEL")
                .arg(self.job_key(id))
                .query(&mut conn)
                .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        }
        Ok(removed)
    }

    async fn upsert_cron(&self, reg: CronRegistration) -> Result<CronUpsert, QueueError> {
        let mut conn = self.conn()?;
        let raw = serde_json::to_string(&reg).map_err(|e| QueueError::Serde(e.to_string()))?;

        let added: i64 = redis::cmd("HSET")
            .arg(self.key("crons"))
            .arg(reg.agent_instance_id.as_str())
            .arg(raw)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(if added == 1 {
            CronUpsert::Created
        } else {
            CronUpsert::Replaced
        })
    }

    async fn list_crons(&self) -> Result<Vec<CronRegistration>, QueueError> {
        let mut conn = self.conn()?;
        let raw: Vec<(String, String)> = redis::cmd("HGETALL")
            .arg(self.key("crons"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;

        let mut regs = Vec::with_capacity(raw.len());
        for (_, value) in raw {
            regs.push(
                serde_json::from_str(&value).map_err(|e| QueueError::Serde(e.to_string()))?,
            );
        }
        Ok(regs)
    }

    async fn mark_cron_run(
        &self,
        agent_instance_id: &str,
        at_ms: u64,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let raw: Option<String> = redis::cmd("HGET")
            .arg(self.key("crons"))
            .arg(agent_instance_id)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let Some(raw) = raw else {
            return Ok(());
        };

        let mut reg: CronRegistration =
            serde_json::from_str(&raw).map_err(|e| QueueError::Serde(e.to_string()))?;
        reg.last_run_at_ms = at_ms;
        let raw = serde_json::to_string(&reg).map_err(|e| QueueError::Serde(e.to_string()))?;
        let _: i64 = redis::cmd("HSET")
            .arg(self.key("crons"))
            .arg(agent_instance_id)
            .arg(raw)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let mut conn = self.conn()?;
        let waiting: u64 = redis::cmd("LLEN")
            .arg(self.key("waiting"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let delayed: u64 = redis::cmd("ZCARD")
            .arg(self.key("delayed"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let active: u64 = redis::cmd("ZCARD")
            .arg(self.key("active"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let completed: u64 = redis::cmd("ZCARD")
            .arg(self.key("completed"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        let failed: u64 = redis::cmd("LLEN")
            .arg(self.key("dlq"))
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;

        Ok(QueueCounts {
            waiting,
            delayed,
            active,
            completed,
            failed,
        })
    }

    async fn recent_dead_letters(&self, limit: usize) -> Result<Vec<DlqEntry>, QueueError> {
        let mut conn = self.conn()?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(self.key("dlq"))
            .arg(0)
            .arg(limit as i64 - 1)
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;

        let mut entries = Vec::with_capacity(raw.len());
        for value in raw {
            entries.push(
                serde_json::from_str(&value).map_err(|e| QueueError::Serde(e.to_string()))?,
            );
        }
        Ok(entries)
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("PING")
            .query(&mut conn)
            .map_err(|e| QueueError::Connectivity(e.to_string()))?;
        Ok(())
    }
}
