// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay Daemon (relayd)
//!
//! Long-running process hosting the scheduling and execution pipeline:
//! one cron-driven scheduler loop (gated by the distributed lock, so any
//! number of relayd replicas may run) and one worker pool of configurable
//! width.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;

use std::sync::Arc;

use relay_adapters::{
    LockClient, LogMetricsSink, MemoryLock, MemoryQueue, QueueClient, RedisLock, RedisQueue,
};
use relay_engine::{
    CronScheduler, NoOpTaskHandler, Producer, ProducerConfig, SchedulerConfig, Shutdown,
    WorkerConfig, WorkerPool,
};
use relay_store::MemoryRunStore;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                println!("Relay daemon - runs the agent job scheduler and worker pool");
                println!();
                println!("USAGE:");
                println!("    relayd");
                println!();
                println!("Configuration is taken from RELAY_* environment variables");
                println!("(queue endpoint, namespace, concurrency, retry policy, tick");
                println!("cron expression, lock key and TTL).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: relayd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = env::Config::load()?;
    let _log_guard = setup_logging(&config)?;

    info!(
        queue = %config.queue_url,
        namespace = %config.namespace,
        concurrency = config.worker_concurrency,
        "starting relayd"
    );

    if config.uses_memory_backend() {
        run_pipeline(MemoryQueue::new(), MemoryLock::new(), &config).await
    } else {
        let url = config.effective_queue_url();
        let queue = RedisQueue::new(&url, config.namespace.clone())?;
        let lock = RedisLock::new(&url)?;
        run_pipeline(queue, lock, &config).await
    }
}

/// Wire the pipeline onto concrete backends and run until a termination
/// signal arrives.
async fn run_pipeline<Q: QueueClient, L: LockClient>(
    queue: Q,
    lock: L,
    config: &env::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryRunStore::new();
    let metrics = LogMetricsSink;

    let producer = Producer::new(
        queue.clone(),
        ProducerConfig {
            max_attempts: config.max_attempts,
            backoff: config.backoff,
            ..ProducerConfig::default()
        },
    );
    let scheduler = CronScheduler::new(
        queue.clone(),
        lock,
        producer,
        metrics.clone(),
        relay_core::SystemClock,
        SchedulerConfig {
            lock_key: config.lock_key.clone(),
            lock_ttl: config.lock_ttl,
            tick_cron: config.tick_cron.clone(),
        },
    );
    let pool = WorkerPool::new(
        queue,
        store,
        NoOpTaskHandler,
        metrics,
        WorkerConfig {
            concurrency: config.worker_concurrency,
            max_attempts: config.max_attempts,
            lease_wait: Duration::from_secs(5),
        },
    );

    let shutdown = Arc::new(Shutdown::new());
    let scheduler_task = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move { scheduler.run(shutdown).await }
    });
    let pool_task = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move { pool.run(shutdown).await }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("relayd ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }

    // Stop leasing and let in-flight executions drain.
    shutdown.signal();
    let _ = scheduler_task.await;
    let _ = pool_task.await;

    info!("relayd stopped");
    Ok(())
}

fn setup_logging(
    config: &env::Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, "relayd.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}
