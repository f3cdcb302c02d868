// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting properties: list invariants around the reservation
//! protocol, serialization round-trips, and boundary behavior.

use crate::prelude::*;
use sd_core::{keys, DefaultPolicy, FileId, TaskPayload, WorkerId};
use sd_queue::{Queue, Task, WorkerHandle};
use std::sync::Arc;
use std::time::Duration;

async fn alive_worker(coord: &Arc<dyn sd_coord::Coordinator>, id: u64) -> WorkerHandle {
    let id = WorkerId::new(id);
    coord
        .set_with_ttl(&keys::worker(id), "1", Duration::from_secs(60))
        .await
        .unwrap();
    WorkerHandle::new(id, coord.clone(), Arc::new(DefaultPolicy::default()))
}

#[tokio::test]
async fn a_task_id_is_never_in_pending_and_working_at_once() {
    let coord = coord();
    let queue = Queue::open("q", coord.clone()).await.unwrap();
    let worker = alive_worker(&coord, 1).await;

    let mut task = Task::new("p.Noop", TaskPayload::default());
    let id = queue.enqueue(&mut task).await.unwrap();

    let check_exclusive = |pending: Vec<String>, working: Vec<String>| {
        let in_pending = pending.contains(&id.to_string());
        let in_working = working.contains(&id.to_string());
        assert!(!(in_pending && in_working), "id in both pending and working");
    };
    check_exclusive(
        list(&coord, &keys::queue_pending("q")).await,
        list(&coord, &keys::queue_working("q")).await,
    );

    let reservation = queue.reserve(&worker, Duration::ZERO).await.unwrap();
    check_exclusive(
        list(&coord, &keys::queue_pending("q")).await,
        list(&coord, &keys::queue_working("q")).await,
    );

    // While in flight, the id sits in exactly one worker's working
    // list, and that worker is the task's.
    assert_eq!(
        list(&coord, &keys::worker_working(worker.id())).await,
        vec![id.to_string()]
    );
    assert_eq!(reservation.task().worker(), Some(worker.id()));

    reservation.checkin_finished().await.unwrap();
    // Completed tasks are absent from every working list.
    assert!(list(&coord, &keys::queue_working("q")).await.is_empty());
    assert!(list(&coord, &keys::worker_working(worker.id())).await.is_empty());
}

#[tokio::test]
async fn reserve_checkin_round_trip_preserves_the_task() {
    let coord = coord();
    let queue = Queue::open("q", coord.clone()).await.unwrap();
    let worker = alive_worker(&coord, 1).await;

    let payload: TaskPayload =
        serde_json::from_str(r#"{"args": [42], "kwargs": {"mode": "fast"}}"#).unwrap();
    let mut task = Task::new("p.Noop", payload.clone());
    let id = queue.enqueue(&mut task).await.unwrap();

    let reservation = queue.reserve(&worker, Duration::ZERO).await.unwrap();
    assert_eq!(reservation.task().id(), Some(id));
    assert_eq!(reservation.task().payload(), &payload);
    assert_eq!(reservation.task().worker(), Some(worker.id()));
    reservation.checkin_finished().await.unwrap();

    let mut reloaded = queue.loader().load(id).await.unwrap();
    assert_eq!(reloaded.payload(), &payload);
    assert!(reloaded.failures().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_lists_round_trip_for_any_list() {
    let coord = coord();
    let queue = Queue::open("q", coord.clone()).await.unwrap();
    let files: Vec<FileId> = [3u64, 1, 4, 1, 5].iter().map(|v| FileId::new(*v)).collect();

    let mut task = Task::new("p.Noop", TaskPayload::default());
    task.set_in_files(files.clone()).unwrap();
    task.set_out_files(files.clone()).unwrap();
    let id = queue.enqueue(&mut task).await.unwrap();

    let mut reloaded = queue.loader().load(id).await.unwrap();
    assert_eq!(reloaded.in_files().await.unwrap(), files.as_slice());
    assert_eq!(reloaded.out_files().await.unwrap(), files.as_slice());
}

#[tokio::test]
async fn failure_counts_never_decrease_and_reach_the_limit() {
    let coord = coord();
    let queue = Queue::open("q", coord.clone()).await.unwrap();
    let worker = alive_worker(&coord, 1).await;

    let mut task = Task::new("p.AlwaysFails", TaskPayload::default());
    let id = queue.enqueue(&mut task).await.unwrap();

    let mut last_count = 0;
    loop {
        let reservation = match queue.reserve(&worker, Duration::ZERO).await {
            Ok(reservation) => reservation,
            Err(_) => break,
        };
        let mut reservation = reservation;
        let failure = sd_core::Failure::new(
            sd_core::FailureKind::ProcessingException,
            "still broken",
        );
        reservation.task_mut().add_failure(failure.clone()).await.unwrap();
        let mut snapshot = queue.loader().load(id).await.unwrap();
        let count = snapshot.failures().await.unwrap().len();
        assert!(count >= last_count, "failure count decreased");
        last_count = count;
        reservation.checkin_failed(&failure, true).await.unwrap();
    }

    let policy = DefaultPolicy::default();
    assert!(last_count >= policy.max_failures);
    assert_eq!(
        list(&coord, &keys::queue_failed("q")).await,
        vec![id.to_string()]
    );
}

#[tokio::test]
async fn blocking_reserve_returns_soon_after_an_enqueue() {
    let coord = coord();
    let queue = Queue::open("q", coord.clone()).await.unwrap();
    let worker = alive_worker(&coord, 1).await;

    let started = std::time::Instant::now();
    let enqueuer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut task = Task::new("p.Noop", TaskPayload::default());
            queue.enqueue(&mut task).await.unwrap()
        })
    };

    let reservation = queue.reserve(&worker, Duration::from_secs(10)).await.unwrap();
    let elapsed = started.elapsed();
    let id = enqueuer.await.unwrap();
    assert_eq!(reservation.task().id(), Some(id));
    // Returned shortly after the enqueue, nowhere near the timeout.
    assert!(elapsed < Duration::from_secs(2));
}
