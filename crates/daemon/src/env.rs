// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use relay_core::BackoffPolicy;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Sentinel queue URL selecting the in-process backend.
pub const MEMORY_QUEUE_URL: &str = "memory";

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

/// Daemon configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue endpoint: `redis://…`, or `memory` for in-process.
    pub queue_url: String,
    /// Upgrade the queue URL scheme to TLS (`rediss://`).
    pub queue_tls: bool,
    /// Key namespace prefix for all queue store keys.
    pub namespace: String,
    pub worker_concurrency: usize,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Cron expression driving the scheduler tick.
    pub tick_cron: String,
    pub lock_key: String,
    pub lock_ttl: Duration,
    /// Log to a file in this directory instead of stderr.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `RELAY_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            queue_url: var_or("RELAY_QUEUE_URL", MEMORY_QUEUE_URL),
            queue_tls: parse_var("RELAY_QUEUE_TLS", false)?,
            namespace: var_or("RELAY_NAMESPACE", "relay"),
            worker_concurrency: parse_var("RELAY_WORKER_CONCURRENCY", 4)?,
            max_attempts: parse_var("RELAY_MAX_ATTEMPTS", 3)?,
            backoff: BackoffPolicy {
                base_ms: parse_var("RELAY_BACKOFF_BASE_MS", 1_000)?,
                ceiling_ms: parse_var("RELAY_BACKOFF_CEILING_MS", 300_000)?,
            },
            tick_cron: var_or("RELAY_TICK_CRON", "* * * * *"),
            lock_key: var_or("RELAY_LOCK_KEY", "relay:scheduler:tick"),
            lock_ttl: Duration::from_millis(parse_var("RELAY_LOCK_TTL_MS", 50_000)?),
            log_dir: std::env::var("RELAY_LOG_DIR").ok().map(PathBuf::from),
        })
    }

    /// Queue URL with the TLS scheme applied when configured.
    pub fn effective_queue_url(&self) -> String {
        if self.queue_tls {
            if let Some(rest) = self.queue_url.strip_prefix("redis://") {
                return format!("rediss://{rest}");
            }
        }
        self.queue_url.clone()
    }

    /// Whether the in-process queue backend is selected.
    pub fn uses_memory_backend(&self) -> bool {
        self.queue_url == MEMORY_QUEUE_URL
    }
}

fn var_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
