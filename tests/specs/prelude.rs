// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

#![allow(dead_code)]

pub use async_trait::async_trait;
pub use sd_coord::Coordinator;
use sd_coord::MemoryCoordinator;
use sd_core::DefaultPolicy;
use sd_node::{Processor, ProcessorError, ProcessorRegistry, Worker, WorkerConfig};
use sd_queue::Task;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll `check` until it reports true or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn coord() -> Arc<dyn Coordinator> {
    Arc::new(MemoryCoordinator::new())
}

/// Processor whose `perform` just returns.
pub struct Noop;

#[async_trait]
impl Processor for Noop {
    async fn process(&self, _task: &mut Task) -> Result<(), ProcessorError> {
        Ok(())
    }
}

/// Fails with a retryable processing exception on the first call,
/// succeeds afterwards.
pub struct Flaky {
    calls: AtomicUsize,
}

impl Flaky {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Processor for Flaky {
    async fn process(&self, _task: &mut Task) -> Result<(), ProcessorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProcessorError::processing("first call always fails", true));
        }
        Ok(())
    }
}

/// Fails with a retryable processing exception on every call.
pub struct AlwaysFails;

#[async_trait]
impl Processor for AlwaysFails {
    async fn process(&self, _task: &mut Task) -> Result<(), ProcessorError> {
        Err(ProcessorError::processing("still broken", true))
    }
}

/// Registry with the spec processors preregistered.
pub fn registry() -> Arc<ProcessorRegistry> {
    let registry = ProcessorRegistry::new();
    registry.register_fn("p.Noop", |_| Noop);
    registry.register_fn("p.Flaky", |_| Flaky::new());
    registry.register_fn("p.AlwaysFails", |_| AlwaysFails);
    Arc::new(registry)
}

/// A one-executor worker on the given queues with a fast reservation
/// loop.
pub async fn quick_worker(
    coord: &Arc<dyn Coordinator>,
    run_dir: &std::path::Path,
    queues: &[&str],
) -> Arc<Worker> {
    let config = WorkerConfig::new(run_dir, queues.iter().map(|q| q.to_string()).collect())
        .executors(1)
        .reserve_timeout(Duration::from_millis(50));
    Worker::create(
        coord.clone(),
        registry(),
        Arc::new(DefaultPolicy::default()),
        config,
        None,
    )
    .await
    .unwrap()
}

pub async fn list(coord: &Arc<dyn Coordinator>, key: &str) -> Vec<String> {
    coord.list_range(key, 0, -1).await.unwrap()
}
