// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent submission and validation specs.

use crate::prelude::*;
use relay_core::AgentRunState;
use relay_engine::{ProducerError, RunServiceError};

#[tokio::test]
async fn resubmitting_a_run_id_creates_no_second_unit_of_work() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    let job = pipeline.run_job("r1");

    let first = service.submit(job.clone()).await.unwrap();
    let second = service.submit(job).await.unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(first.run_id, second.run_id);
    assert_eq!(pipeline.store.len(), 1);
    assert_eq!(pipeline.queue.counts().await.unwrap().waiting, 1);
}

#[tokio::test]
async fn submitted_twice_still_runs_to_completion_once() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();

    service.submit(pipeline.run_job("r1")).await.unwrap();
    service.submit(pipeline.run_job("r1")).await.unwrap();

    assert_eq!(pipeline.state("r1").await, AgentRunState::Pending);
    let executed = pipeline.execute_all().await;

    assert_eq!(executed, 1);
    assert_eq!(pipeline.state("r1").await, AgentRunState::Completed);
    assert_eq!(pipeline.handler.executions("r1"), 1);

    let run = pipeline
        .store
        .get(&"r1".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.attempts_made, 1);
    assert!(run.started_at_ms.is_some());
    assert!(run.finished_at_ms.is_some());
}

#[tokio::test]
async fn malformed_envelope_is_rejected_listing_fields() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();

    let mut job = pipeline.run_job("r1");
    job.user_id = "".into();
    job.agent_instance_id = " ".into();

    let err = service.submit(job).await.unwrap_err();
    match err {
        RunServiceError::Producer(ProducerError::Validation(v)) => {
            assert_eq!(v.fields, vec!["agent_instance_id", "user_id"]);
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert!(pipeline.store.is_empty());
}

#[tokio::test]
async fn cron_resubmission_replaces_rather_than_duplicates() {
    let pipeline = Pipeline::new();
    let producer = pipeline.producer();

    let first = producer
        .submit_cron(pipeline.cron_job("a1", "* * * * *"))
        .await
        .unwrap();
    let second = producer
        .submit_cron(pipeline.cron_job("a1", "*/10 * * * *"))
        .await
        .unwrap();

    assert!(!first.replaced);
    assert!(second.replaced);

    let regs = pipeline.queue.list_crons().await.unwrap();
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0].schedule, "*/10 * * * *");
}

#[tokio::test]
async fn invalid_cron_syntax_is_rejected() {
    let pipeline = Pipeline::new();
    let producer = pipeline.producer();

    let err = producer
        .submit_cron(pipeline.cron_job("a1", "every tuesday"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProducerError::Scheduling(_)));
    assert!(pipeline.queue.list_crons().await.unwrap().is_empty());
}
