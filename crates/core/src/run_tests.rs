// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn valid_job_passes() {
    let job = RunJob::builder().build();
    assert!(job.validate().is_ok());
}

#[test]
fn valid_job_with_input_and_request_id() {
    let job = RunJob::builder()
        .input(serde_json::json!({"prompt": "hello"}))
        .request_id("req-1")
        .build();
    assert!(job.validate().is_ok());
}

#[yare::parameterized(
    empty_run_id     = { "",     "agent-1", "user-1", "run_id" },
    blank_run_id     = { "   ",  "agent-1", "user-1", "run_id" },
    empty_agent      = { "r1",   "",        "user-1", "agent_instance_id" },
    empty_user       = { "r1",   "agent-1", "",       "user_id" },
)]
fn missing_field_is_reported(run_id: &str, agent: &str, user: &str, expected: &str) {
    let job = RunJob::builder()
        .run_id(run_id)
        .agent_instance_id(agent)
        .user_id(user)
        .build();

    let err = job.validate().unwrap_err();
    assert_eq!(err.fields, vec![expected.to_string()]);
}

#[test]
fn all_offending_fields_are_listed() {
    let job = RunJob::builder()
        .run_id("")
        .agent_instance_id("")
        .user_id("")
        .build();

    let err = job.validate().unwrap_err();
    assert_eq!(err.fields, vec!["run_id", "agent_instance_id", "user_id"]);
}

#[test]
fn oversized_id_is_rejected() {
    let job = RunJob::builder().run_id("x".repeat(MAX_ID_LEN + 1)).build();
    let err = job.validate().unwrap_err();
    assert_eq!(err.fields, vec!["run_id"]);
}

#[test]
fn blank_request_id_is_rejected() {
    let job = RunJob::builder().request_id("  ").build();
    let err = job.validate().unwrap_err();
    assert_eq!(err.fields, vec!["request_id"]);
}

#[test]
fn validation_error_display_lists_fields() {
    let err = ValidationError {
        fields: vec!["run_id".to_string(), "user_id".to_string()],
    };
    assert_eq!(err.to_string(), "invalid fields: run_id, user_id");
}

#[test]
fn run_job_serde_round_trip() {
    let job = RunJob::builder()
        .input(serde_json::json!({"k": 1}))
        .request_id("req-9")
        .build();

    let json = serde_json::to_string(&job).unwrap();
    let restored: RunJob = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, job);
}

#[test]
fn optional_fields_are_omitted_when_absent() {
    let job = RunJob::builder().build();
    let json = serde_json::to_string(&job).unwrap();
    assert!(!json.contains("input"));
    assert!(!json.contains("request_id"));
}
