// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead letter queue entry.

use crate::run::RunJob;
use serde::{Deserialize, Serialize};

/// A job that exhausted its retry budget, held for manual inspection.
///
/// Created exactly once per job, when the attempt count reaches the
/// configured maximum. Carries the original payload verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlqEntry {
    pub job: RunJob,
    pub attempts_made: u32,
    pub failed_at_ms: u64,
    pub last_error: String,
}
