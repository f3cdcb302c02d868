// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue lifecycle scenarios: run, retry, escalate, unknown
//! processor, and peer-death observation.

use crate::prelude::*;
use sd_core::{keys, FailureKind, TaskPayload};
use sd_node::{enqueue, Host, HostConfig};
use sd_files::FsBackend;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn enqueue_run_finish() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let queue = sd_queue::Queue::open("Q", coord.clone()).await.unwrap();
    let task = enqueue(&queue, "p.Noop", TaskPayload::default()).await.unwrap();
    let id = task.id().unwrap();

    let worker = quick_worker(&coord, dir.path(), &["Q"]).await;
    worker.start().await.unwrap();

    let finished = eventually(Duration::from_secs(5), || {
        let coord = coord.clone();
        async move { list(&coord, &keys::queue_finished("Q")).await.contains(&id.to_string()) }
    })
    .await;
    worker.shutdown().await.unwrap();
    assert!(finished, "task never reached the finished list");

    // Exactly once on finished, no failures, no in-flight leftovers.
    let finished_ids = list(&coord, &keys::queue_finished("Q")).await;
    assert_eq!(finished_ids.iter().filter(|v| **v == id.to_string()).count(), 1);
    let mut reloaded = queue.loader().load(id).await.unwrap();
    assert!(reloaded.failures().await.unwrap().is_empty());
    assert!(list(&coord, &keys::worker_working(worker.id())).await.is_empty());
    assert!(list(&coord, &keys::queue_working("Q")).await.is_empty());
}

#[tokio::test]
async fn retryable_failure_then_success() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let queue = sd_queue::Queue::open("Q", coord.clone()).await.unwrap();
    let task = enqueue(&queue, "p.Flaky", TaskPayload::default()).await.unwrap();
    let id = task.id().unwrap();

    let worker = quick_worker(&coord, dir.path(), &["Q"]).await;
    worker.start().await.unwrap();

    let finished = eventually(Duration::from_secs(5), || {
        let coord = coord.clone();
        async move { list(&coord, &keys::queue_finished("Q")).await.contains(&id.to_string()) }
    })
    .await;
    worker.shutdown().await.unwrap();
    assert!(finished, "flaky task never recovered");

    let mut reloaded = queue.loader().load(id).await.unwrap();
    let failures = reloaded.failures().await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::ProcessingException);
}

#[tokio::test]
async fn repeated_failures_escalate_to_the_failed_list() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let queue = sd_queue::Queue::open("Q", coord.clone()).await.unwrap();
    let task = enqueue(&queue, "p.AlwaysFails", TaskPayload::default()).await.unwrap();
    let id = task.id().unwrap();

    let worker = quick_worker(&coord, dir.path(), &["Q"]).await;
    worker.start().await.unwrap();

    let failed = eventually(Duration::from_secs(10), || {
        let coord = coord.clone();
        async move { list(&coord, &keys::queue_failed("Q")).await.contains(&id.to_string()) }
    })
    .await;
    worker.shutdown().await.unwrap();
    assert!(failed, "task never escalated");

    let mut reloaded = queue.loader().load(id).await.unwrap();
    assert_eq!(reloaded.failures().await.unwrap().len(), 5);
    assert!(list(&coord, &keys::queue_pending("Q")).await.is_empty());
    assert!(list(&coord, &keys::queue_working("Q")).await.is_empty());
    assert!(list(&coord, &keys::worker_working(worker.id())).await.is_empty());
}

#[tokio::test]
async fn unknown_processor_fails_fast() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let queue = sd_queue::Queue::open("Q", coord.clone()).await.unwrap();
    let task = enqueue(&queue, "does.not.Exist", TaskPayload::default()).await.unwrap();
    let id = task.id().unwrap();

    let worker = quick_worker(&coord, dir.path(), &["Q"]).await;
    worker.start().await.unwrap();

    let failed = eventually(Duration::from_secs(5), || {
        let coord = coord.clone();
        async move { list(&coord, &keys::queue_failed("Q")).await.contains(&id.to_string()) }
    })
    .await;
    worker.shutdown().await.unwrap();
    assert!(failed, "task never failed");

    let mut reloaded = queue.loader().load(id).await.unwrap();
    let failures = reloaded.failures().await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::UnknownProcessor);
    // Not requeued: a single failure went straight to failed.
    assert!(list(&coord, &keys::queue_pending("Q")).await.is_empty());
}

#[tokio::test]
async fn host_death_is_observed_by_a_peer() {
    let coord = coord();

    // The doomed peer: registered by hand with a short TTL, then never
    // refreshed (as if the process died right after registering).
    coord
        .hash_set_multiple(
            "host:99",
            &[
                ("id".to_string(), "99".to_string()),
                ("address".to_string(), "10.0.0.9".to_string()),
                ("port".to_string(), "9300".to_string()),
            ],
        )
        .await
        .unwrap();
    coord.expire("host:99", Duration::from_millis(150)).await.unwrap();
    coord.set_add(keys::HOSTS_SET, "99").await.unwrap();

    // A live host whose reaper will notice.
    let survivor = Host::create(
        coord.clone(),
        Arc::new(FsBackend::new()),
        HostConfig::new("127.0.0.1", 0).timing(Duration::from_secs(60), Duration::from_millis(20)),
        None,
    )
    .await
    .unwrap();
    survivor.start().await.unwrap();

    let purged = eventually(Duration::from_secs(5), || {
        let coord = coord.clone();
        async move {
            !coord
                .set_members(keys::HOSTS_SET)
                .await
                .unwrap()
                .contains(&"99".to_string())
        }
    })
    .await;
    survivor.shutdown().await.unwrap();
    assert!(purged, "dead host was never removed from the hosts set");
}
