// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutual-exclusion lock.
//!
//! A lease-like lock usable by independent processes to coordinate who
//! performs an action. Contention is an expected outcome, not an error:
//! `acquire` returns `None` when another holder owns the key. Expiry under
//! a slow holder is tolerated; callers must rely on idempotency, not on
//! exclusivity, for correctness.

mod memory;
mod redis;

pub use self::redis::RedisLock;
pub use memory::MemoryLock;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from lock operations
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock backend unreachable: {0}")]
    Connectivity(String),
}

/// Held lock lease. Released explicitly or by TTL expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    /// Owner token; release is a no-op unless the token still matches.
    pub token: String,
}

/// Client for a distributed lock backend.
#[async_trait]
pub trait LockClient: Clone + Send + Sync + 'static {
    /// Try to acquire `key` for `ttl`. Returns `None` on contention.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockLease>, LockError>;

    /// Release a held lease. Ignored if the lease already expired or the
    /// key was re-acquired by another owner.
    async fn release(&self, lease: LockLease) -> Result<(), LockError>;
}
