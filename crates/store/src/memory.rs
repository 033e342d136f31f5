// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory status store.

use crate::run_store::{CreateOutcome, RunStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{AgentRun, AgentRunState, RunId};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory implementation of [`RunStore`].
#[derive(Clone, Default)]
pub struct MemoryRunStore {
    runs: Arc<Mutex<HashMap<String, AgentRun>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held (test inspection).
    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.runs.lock().is_empty()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_if_absent(&self, run: AgentRun) -> Result<CreateOutcome, StoreError> {
        let mut runs = self.runs.lock();
        let key = run.run_id.as_str().to_string();
        match runs.get(&key) {
            Some(existing) => Ok(CreateOutcome::Existing(existing.clone())),
            None => {
                runs.insert(key, run);
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn get(&self, run_id: &RunId) -> Result<Option<AgentRun>, StoreError> {
        Ok(self.runs.lock().get(run_id.as_str()).cloned())
    }

    async fn transition(
        &self,
        run_id: &RunId,
        to: AgentRunState,
        now_ms: u64,
    ) -> Result<AgentRun, StoreError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::NotFound(run_id.clone()))?;
        run.transition(to, now_ms)?;
        if to == AgentRunState::Running {
            run.attempts_made += 1;
        }
        Ok(run.clone())
    }

    async fn set_error(&self, run_id: &RunId, error: &str) -> Result<(), StoreError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::NotFound(run_id.clone()))?;
        run.error = Some(error.to_string());
        Ok(())
    }

    async fn append_note(
        &self,
        run_id: &RunId,
        message: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut runs = self.runs.lock();
        let run = runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StoreError::NotFound(run_id.clone()))?;
        run.push_note(message, now_ms);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
