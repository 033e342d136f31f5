// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown signal shared by the scheduler loop and worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One-way shutdown flag with async wakeup.
///
/// Unlike a bare `Notify`, a signal raised before anyone is waiting is not
/// lost: `wait` checks the flag first.
#[derive(Default)]
pub struct Shutdown {
    flag: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the shutdown flag and wake all waiters.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether shutdown has been signalled.
    pub fn is_signalled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is signalled.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register before checking the flag so a concurrent signal
            // cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_signalled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
