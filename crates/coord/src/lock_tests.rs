// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryCoordinator;

fn coord() -> Arc<dyn Coordinator> {
    Arc::new(MemoryCoordinator::new())
}

#[tokio::test]
async fn lock_roundtrip_sets_and_clears_the_key() {
    let coord = coord();
    let guard = CoordLock::new(coord.clone(), "file:1:lock").acquire().await.unwrap();
    assert!(coord.exists("file:1:lock").await.unwrap());
    guard.release().await.unwrap();
    assert!(!coord.exists("file:1:lock").await.unwrap());
}

#[tokio::test]
async fn waiter_gets_the_lock_after_release() {
    let coord = coord();
    let guard = CoordLock::new(coord.clone(), "file:2:lock")
        .with_timing(Duration::from_millis(200), Duration::from_millis(10))
        .acquire()
        .await
        .unwrap();

    let waiter = {
        let coord = coord.clone();
        tokio::spawn(async move {
            CoordLock::new(coord, "file:2:lock")
                .with_timing(Duration::from_millis(200), Duration::from_millis(10))
                .acquire()
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    guard.release().await.unwrap();
    let second = waiter.await.unwrap().unwrap();
    second.release().await.unwrap();
}

#[tokio::test]
async fn stale_holder_is_taken_over_after_ttl() {
    let coord = coord();
    // Simulate a crashed holder that never releases.
    coord
        .set_with_ttl("file:3:lock", "1", Duration::from_secs(3600))
        .await
        .unwrap();

    let guard = CoordLock::new(coord.clone(), "file:3:lock")
        .with_timing(Duration::from_millis(60), Duration::from_millis(10))
        .acquire()
        .await
        .unwrap();
    guard.release().await.unwrap();
}
