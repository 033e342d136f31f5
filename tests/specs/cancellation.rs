// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation boundary specs.

use crate::prelude::*;
use relay_core::{AgentRunState, RunId};
use relay_engine::RunServiceError;
use std::time::Duration;

#[tokio::test]
async fn pending_run_cancels_and_leaves_the_queue() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();

    service.cancel(&RunId::new("r1")).await.unwrap();

    assert_eq!(pipeline.state("r1").await, AgentRunState::Cancelled);
    assert_eq!(pipeline.queue.counts().await.unwrap().waiting, 0);
    assert!(pipeline
        .queue
        .lease(Duration::ZERO)
        .await
        .unwrap()
        .is_none());
    assert_eq!(pipeline.handler.executions("r1"), 0);
}

#[tokio::test]
async fn running_run_cannot_be_cancelled() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();

    // A worker started executing
    pipeline
        .store
        .transition(&RunId::new("r1"), AgentRunState::Running, 10)
        .await
        .unwrap();

    let err = service.cancel(&RunId::new("r1")).await.unwrap_err();
    assert!(matches!(
        err,
        RunServiceError::Conflict {
            state: AgentRunState::Running,
            ..
        }
    ));
}

#[tokio::test]
async fn terminal_run_cannot_be_cancelled() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();
    pipeline.execute_all().await;
    assert_eq!(pipeline.state("r1").await, AgentRunState::Completed);

    let err = service.cancel(&RunId::new("r1")).await.unwrap_err();
    assert!(matches!(err, RunServiceError::Conflict { .. }));
}

#[tokio::test]
async fn cancelling_an_unknown_run_is_not_found() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();

    let err = service.cancel(&RunId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, RunServiceError::NotFound(_)));
}

#[tokio::test]
async fn status_reads_survive_cancellation() {
    let pipeline = Pipeline::new();
    let service = pipeline.service();
    service.submit(pipeline.run_job("r1")).await.unwrap();
    service.cancel(&RunId::new("r1")).await.unwrap();

    // The record is never deleted by the pipeline
    let run = service.status(&RunId::new("r1")).await.unwrap();
    assert_eq!(run.state, AgentRunState::Cancelled);
    assert!(run.finished_at_ms.is_some());
}
