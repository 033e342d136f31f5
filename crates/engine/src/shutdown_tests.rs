// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn signal_before_wait_is_not_lost() {
    let shutdown = Shutdown::new();
    shutdown.signal();
    // Completes immediately
    shutdown.wait().await;
    assert!(shutdown.is_signalled());
}

#[tokio::test]
async fn wait_wakes_on_signal() {
    let shutdown = Arc::new(Shutdown::new());
    let waiter = Arc::clone(&shutdown);
    let handle = tokio::spawn(async move { waiter.wait().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!handle.is_finished());

    shutdown.signal();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
