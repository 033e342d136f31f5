// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory lock backend for tests and single-process deployments.

use super::{LockClient, LockError, LockLease};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Held {
    token: String,
    expires_at_ms: u64,
}

/// In-memory implementation of [`LockClient`].
pub struct MemoryLock<C: Clock = SystemClock> {
    held: Arc<Mutex<HashMap<String, Held>>>,
    clock: C,
}

impl<C: Clock> Clone for MemoryLock<C> {
    fn clone(&self) -> Self {
        Self {
            held: Arc::clone(&self.held),
            clock: self.clock.clone(),
        }
    }
}

impl MemoryLock<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryLock<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryLock<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> LockClient for MemoryLock<C> {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, LockError> {
        let now_ms = self.clock.epoch_ms();
        let mut held = self.held.lock();

        let occupied = matches!(held.get(key), Some(h) if h.expires_at_ms > now_ms);
        if occupied {
            return Ok(None);
        }

        let token = uuid::Uuid::new_v4().to_string();
        held.insert(
            key.to_string(),
            Held {
                token: token.clone(),
                expires_at_ms: now_ms + ttl.as_millis() as u64,
            },
        );
        Ok(Some(LockLease {
            key: key.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: LockLease) -> Result<(), LockError> {
        let mut held = self.held.lock();
        let owned = matches!(held.get(&lease.key), Some(h) if h.token == lease.token);
        if owned {
            held.remove(&lease.key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
