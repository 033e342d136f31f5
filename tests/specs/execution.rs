// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution lifecycle specs: retry with backoff and dead-lettering.

use crate::prelude::*;
use relay_core::AgentRunState;
use std::time::Duration;

#[tokio::test]
async fn flaky_handler_retries_then_completes_with_exact_attempt_count() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();

    // Fails twice (k = 2 < M = 3), then succeeds
    pipeline.handler.fail_times("r1", 2, "transient glitch");

    // Attempt 1 fails; redelivery waits out the 1s base delay
    pipeline.execute_next().await;
    assert!(pipeline
        .queue
        .lease(Duration::ZERO)
        .await
        .unwrap()
        .is_none());
    pipeline.clock.advance(Duration::from_secs(1));

    // Attempt 2 fails; the delay doubles
    pipeline.execute_next().await;
    pipeline.clock.advance(Duration::from_secs(1));
    assert!(pipeline
        .queue
        .lease(Duration::ZERO)
        .await
        .unwrap()
        .is_none());
    pipeline.clock.advance(Duration::from_secs(1));

    // Attempt 3 succeeds
    pipeline.execute_next().await;

    assert_eq!(pipeline.state("r1").await, AgentRunState::Completed);
    assert_eq!(pipeline.handler.executions("r1"), 3);

    let run = pipeline.store.get(&"r1".into()).await.unwrap().unwrap();
    assert_eq!(run.attempts_made, 3);
    assert_eq!(run.notes.len(), 2);
    assert!(run.error.is_none());
}

#[tokio::test]
async fn always_failing_handler_dead_letters_exactly_once() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();
    pipeline.handler.fail_always("r1", "model unavailable");

    for delay_secs in [1, 2] {
        pipeline.execute_next().await;
        pipeline.clock.advance(Duration::from_secs(delay_secs));
    }
    pipeline.execute_next().await;

    // Terminal failure is visible in the status record…
    assert_eq!(pipeline.state("r1").await, AgentRunState::Failed);
    let run = pipeline.store.get(&"r1".into()).await.unwrap().unwrap();
    assert_eq!(run.error.as_deref(), Some("model unavailable"));

    // …and exactly once in the DLQ, with the final failure message
    let entries = pipeline.queue.recent_dead_letters(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].last_error, "model unavailable");
    assert_eq!(entries[0].attempts_made, 3);

    // No further redelivery, ever
    pipeline.clock.advance(Duration::from_secs(3_600));
    assert!(pipeline
        .queue
        .lease(Duration::ZERO)
        .await
        .unwrap()
        .is_none());
    assert_eq!(pipeline.handler.executions("r1"), 3);
}

#[tokio::test]
async fn paused_run_awaits_input_without_redelivery() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();
    pipeline.handler.pause("r1");

    pipeline.execute_next().await;

    assert_eq!(pipeline.state("r1").await, AgentRunState::AwaitingInput);
    pipeline.clock.advance(Duration::from_secs(600));
    assert!(pipeline
        .queue
        .lease(Duration::ZERO)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn independent_runs_do_not_interfere() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("flaky")).await.unwrap();
    service.submit(pipeline.run_job("steady")).await.unwrap();
    pipeline.handler.fail_always("flaky", "broken");

    // Everything deliverable right now: flaky attempt 1, steady attempt 1
    pipeline.execute_all().await;
    assert_eq!(pipeline.state("steady").await, AgentRunState::Completed);
    assert_eq!(pipeline.state("flaky").await, AgentRunState::Pending);

    // Drive flaky to exhaustion
    pipeline.clock.advance(Duration::from_secs(1));
    pipeline.execute_all().await;
    pipeline.clock.advance(Duration::from_secs(2));
    pipeline.execute_all().await;

    assert_eq!(pipeline.state("flaky").await, AgentRunState::Failed);
    assert_eq!(pipeline.state("steady").await, AgentRunState::Completed);
    assert_eq!(pipeline.queue.recent_dead_letters(10).await.unwrap().len(), 1);
}
