// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug surface specs: depth, failures, health, metrics.

use crate::prelude::*;
use relay_engine::DebugSurface;
use std::time::Duration;

#[tokio::test]
async fn queue_depth_tracks_job_states() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    let surface = DebugSurface::new(pipeline.queue.clone());

    // Leases come back in submission order
    service.submit(pipeline.run_job("active")).await.unwrap();
    service.submit(pipeline.run_job("done")).await.unwrap();
    service.submit(pipeline.run_job("retrying")).await.unwrap();
    service.submit(pipeline.run_job("waiting")).await.unwrap();
    pipeline.handler.fail_times("retrying", 1, "hiccup");

    // active: leased but never finished; done: completed; retrying: first
    // attempt fails into the delayed set; waiting: untouched
    let pool = pipeline.pool();
    for _ in 0..3 {
        let lease = pipeline.queue.lease(Duration::ZERO).await.unwrap().unwrap();
        if lease.job.run_id == "active" {
            continue;
        }
        pool.execute(lease).await;
    }

    let counts = surface.queue_depth().await.unwrap();
    assert_eq!(counts.waiting, 1);
    assert_eq!(counts.active, 1);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.delayed, 1);
    assert_eq!(counts.failed, 0);
}

#[tokio::test]
async fn recent_failures_expose_dead_letters_newest_first() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    let surface = DebugSurface::new(pipeline.queue.clone());

    for id in ["r1", "r2"] {
        service.submit(pipeline.run_job(id)).await.unwrap();
        pipeline.handler.fail_always(id, "agent crashed");
    }

    // Drive both to exhaustion (3 attempts each)
    for _ in 0..3 {
        pipeline.execute_all().await;
        pipeline.clock.advance(Duration::from_secs(4));
    }

    let failures = surface.recent_failures(10).await.unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].job.run_id, "r2");
    assert_eq!(failures[0].last_error, "agent crashed");

    let capped = surface.recent_failures(1).await.unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn health_reports_queue_connectivity() {
    let pipeline = Pipeline::new();
    let surface = DebugSurface::new(pipeline.queue.clone());

    let health = surface.health().await;
    assert!(health.queue_ok);
}

#[tokio::test]
async fn worker_metrics_count_outcomes() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();

    service.submit(pipeline.run_job("ok")).await.unwrap();
    service.submit(pipeline.run_job("bad")).await.unwrap();
    pipeline.handler.fail_always("bad", "broken");

    for _ in 0..3 {
        pipeline.execute_all().await;
        pipeline.clock.advance(Duration::from_secs(4));
    }

    assert_eq!(pipeline.metrics.counter("worker.completed"), 1);
    assert_eq!(pipeline.metrics.counter("worker.retried"), 2);
    assert_eq!(pipeline.metrics.counter("worker.dead_lettered"), 1);
}
