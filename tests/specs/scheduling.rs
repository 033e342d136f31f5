// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring scheduling specs: mutual exclusion and tick idempotency.

use crate::prelude::*;
use relay_core::AgentRunState;
use relay_engine::TickOutcome;
use std::collections::HashSet;

#[tokio::test]
async fn three_minutes_of_ticks_enqueue_three_distinct_runs() {
    let pipeline = Pipeline::new();
    pipeline
        .producer()
        .submit_cron(pipeline.cron_job("a1", "* * * * *"))
        .await
        .unwrap();
    let scheduler = pipeline.scheduler();

    let mut run_ids = HashSet::new();
    for _ in 0..3 {
        pipeline.clock.advance(MINUTE);
        assert_eq!(scheduler.tick().await, TickOutcome::Ran { enqueued: 1 });

        let lease = pipeline
            .queue
            .lease(std::time::Duration::ZERO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lease.job.agent_instance_id, "a1");
        run_ids.insert(lease.job.run_id.as_str().to_string());
        pipeline.pool().execute(lease).await;
    }

    assert_eq!(run_ids.len(), 3);
}

#[tokio::test]
async fn only_one_replica_runs_the_due_check_per_window() {
    let pipeline = Pipeline::new();
    pipeline
        .producer()
        .submit_cron(pipeline.cron_job("a1", "* * * * *"))
        .await
        .unwrap();

    // Two scheduler replicas sharing the lock key and clock
    let first = pipeline.scheduler();
    let second = pipeline.scheduler();

    pipeline.clock.advance(MINUTE);
    let outcomes = (first.tick().await, second.tick().await);

    assert_eq!(outcomes.0, TickOutcome::Ran { enqueued: 1 });
    assert_eq!(outcomes.1, TickOutcome::Skipped);
    assert_eq!(pipeline.queue.counts().await.unwrap().waiting, 1);

    // A skipped tick is invisible except to operator metrics
    assert_eq!(pipeline.metrics.counter("scheduler.ticks_skipped"), 1);
}

#[tokio::test]
async fn overlapping_replicas_never_double_enqueue_across_windows() {
    let pipeline = Pipeline::new();
    pipeline
        .producer()
        .submit_cron(pipeline.cron_job("a1", "* * * * *"))
        .await
        .unwrap();
    let first = pipeline.scheduler();
    let second = pipeline.scheduler();

    let mut enqueued_total = 0;
    for _ in 0..5 {
        pipeline.clock.advance(MINUTE);
        for scheduler in [&first, &second] {
            if let TickOutcome::Ran { enqueued } = scheduler.tick().await {
                enqueued_total += enqueued;
            }
        }
    }

    // One run per fire window regardless of replica interleaving
    assert_eq!(enqueued_total, 5);
}

#[tokio::test]
async fn cron_spawned_run_completes_without_a_precreated_record() {
    let pipeline = Pipeline::new();
    pipeline
        .producer()
        .submit_cron(pipeline.cron_job("a1", "* * * * *"))
        .await
        .unwrap();
    let scheduler = pipeline.scheduler();

    pipeline.clock.advance(MINUTE);
    scheduler.tick().await;
    pipeline.execute_next().await;

    // The worker ensured the status record lazily
    let expected_run_id = format!("cron-a1-{}", MINUTE.as_millis());
    assert_eq!(
        pipeline.state(&expected_run_id).await,
        AgentRunState::Completed
    );
}

#[tokio::test]
async fn scheduler_survives_an_unparseable_registration() {
    let pipeline = Pipeline::new();
    let producer = pipeline.producer();
    producer
        .submit_cron(pipeline.cron_job("good", "* * * * *"))
        .await
        .unwrap();

    // Corrupt a registration behind the producer's validation
    let mut bad = relay_core::CronRegistration::new(pipeline.cron_job("bad", "* * * * *"), 0);
    bad.schedule = "no longer a cron".to_string();
    pipeline.queue.upsert_cron(bad).await.unwrap();

    pipeline.clock.advance(MINUTE);
    let outcome = pipeline.scheduler().tick().await;

    // The bad registration is skipped with a warning; the good one fires
    assert_eq!(outcome, TickOutcome::Ran { enqueued: 1 });
}
