// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed lock (`SET NX PX` + owner token).

use super::{LockClient, LockError, LockLease};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Distributed lock on a shared redis instance.
#[derive(Clone)]
pub struct RedisLock {
    client: Arc<redis::Client>,
}

impl RedisLock {
    /// Connect to the given redis URL (`redis://…` or `rediss://…`).
    pub fn new(url: impl AsRef<str>) -> Result<Self, LockError> {
        let client = redis::Client::open(url.as_ref())
            .map_err(|e| LockError::Connectivity(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    fn conn(&self) -> Result<redis::Connection, LockError> {
        self.client
            .get_connection()
            .map_err(|e| LockError::Connectivity(e.to_string()))
    }
}

#[async_trait]
impl LockClient for RedisLock {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, LockError> {
        let mut conn = self.conn()?;
        let token = uuid::Uuid::new_v4().to_string();

        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query(&mut conn)
            .map_err(|e| LockError::Connectivity(e.to_string()))?;

        Ok(set.map(|_| LockLease {
            key: key.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: LockLease) -> Result<(), LockError> {
        let mut conn = self.conn()?;

        // Token check and delete are two commands; the narrow race this
        // leaves open only ever releases early, and enqueue idempotency
        // already covers a doubled tick.
        let current: Option<String> = redis::cmd("GET")
            .arg(&lease.key)
            .query(&mut conn)
            .map_err(|e| LockError::Connectivity(e.to_string()))?;
        if current.as_deref() == Some(lease.token.as_str()) {
            let _: i64 = redis::cmd("DEL")
                .arg(&lease.key)
                .query(&mut conn)
                .map_err(|e| LockError::Connectivity(e.to_string()))?;
        }
        Ok(())
    }
}
