// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::RunJob;

fn pending(run_id: &str) -> AgentRun {
    AgentRun::pending(&RunJob::builder().run_id(run_id).build(), 100)
}

#[tokio::test]
async fn create_if_absent_returns_existing_on_second_call() {
    let store = MemoryRunStore::new();

    let first = store.create_if_absent(pending("r1")).await.unwrap();
    assert_eq!(first, CreateOutcome::Created);

    let second = store.create_if_absent(pending("r1")).await.unwrap();
    match second {
        CreateOutcome::Existing(run) => assert_eq!(run.run_id, "r1"),
        CreateOutcome::Created => panic!("expected existing record"),
    }
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn get_missing_returns_none() {
    let store = MemoryRunStore::new();
    assert!(store.get(&RunId::new("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn transition_to_running_bumps_attempts() {
    let store = MemoryRunStore::new();
    store.create_if_absent(pending("r1")).await.unwrap();

    let run = store
        .transition(&RunId::new("r1"), AgentRunState::Running, 200)
        .await
        .unwrap();
    assert_eq!(run.state, AgentRunState::Running);
    assert_eq!(run.attempts_made, 1);
    assert_eq!(run.started_at_ms, Some(200));

    // Retry cycle bumps again
    store
        .transition(&RunId::new("r1"), AgentRunState::Pending, 300)
        .await
        .unwrap();
    let run = store
        .transition(&RunId::new("r1"), AgentRunState::Running, 400)
        .await
        .unwrap();
    assert_eq!(run.attempts_made, 2);
}

#[tokio::test]
async fn invalid_transition_is_conflict() {
    let store = MemoryRunStore::new();
    store.create_if_absent(pending("r1")).await.unwrap();
    store
        .transition(&RunId::new("r1"), AgentRunState::Running, 200)
        .await
        .unwrap();

    let err = store
        .transition(&RunId::new("r1"), AgentRunState::Cancelled, 300)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition(_)));
}

#[tokio::test]
async fn transition_on_missing_run_is_not_found() {
    let store = MemoryRunStore::new();
    let err = store
        .transition(&RunId::new("ghost"), AgentRunState::Running, 200)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn error_and_notes_are_recorded() {
    let store = MemoryRunStore::new();
    store.create_if_absent(pending("r1")).await.unwrap();

    store
        .append_note(&RunId::new("r1"), "attempt 1 failed: boom", 250)
        .await
        .unwrap();
    store.set_error(&RunId::new("r1"), "boom").await.unwrap();

    let run = store.get(&RunId::new("r1")).await.unwrap().unwrap();
    assert_eq!(run.error.as_deref(), Some("boom"));
    assert_eq!(run.notes.len(), 1);
    assert_eq!(run.notes[0].message, "attempt 1 failed: boom");
}
