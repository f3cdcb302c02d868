// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle.
//!
//! A worker registers itself (`workers` set plus the TTL-bounded
//! `worker:<id>` key), starts its executor pool and heartbeat, and on
//! shutdown drains the pool before unregistering so final check-ins
//! still count. Its reaper requeues dead peers' in-flight tasks.

use crate::error::NodeError;
use crate::manager::ProcessingManager;
use crate::pool::WorkerPool;
use crate::processor::WorkerEnv;
use crate::registry::ProcessorRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;
use sd_core::{keys, Policy, TaskId, WorkerId};
use sd_coord::{Coordinator, Heartbeat, HeartbeatHandle, Purger};
use sd_files::FileLoader;
use sd_queue::{Queue, QueueWatcher, TaskLoader, WorkerHandle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Worker tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-task run directories.
    pub run_dir: PathBuf,
    /// Queues to watch, highest priority first.
    pub queues: Vec<String>,
    /// Executor count.
    pub executors: usize,
    /// Per-reservation wait inside each executor loop.
    pub reserve_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(run_dir: impl Into<PathBuf>, queues: Vec<String>) -> Self {
        Self {
            run_dir: run_dir.into(),
            queues,
            executors: 1,
            reserve_timeout: Duration::from_secs(5),
        }
    }

    pub fn executors(mut self, executors: usize) -> Self {
        self.executors = executors.max(1);
        self
    }

    pub fn reserve_timeout(mut self, timeout: Duration) -> Self {
        self.reserve_timeout = timeout;
        self
    }
}

struct RunningWorker {
    heartbeat: HeartbeatHandle,
    pool: WorkerPool,
}

/// One worker process.
pub struct Worker {
    id: WorkerId,
    coord: Arc<dyn Coordinator>,
    policy: Arc<dyn Policy>,
    registry: Arc<ProcessorRegistry>,
    env: WorkerEnv,
    config: WorkerConfig,
    running: Mutex<Option<RunningWorker>>,
}

impl Worker {
    /// Allocate an id and build the worker. `id` may be passed to
    /// resume an identity persisted by the surrounding daemon.
    pub async fn create(
        coord: Arc<dyn Coordinator>,
        registry: Arc<ProcessorRegistry>,
        policy: Arc<dyn Policy>,
        config: WorkerConfig,
        id: Option<WorkerId>,
    ) -> Result<Arc<Self>, NodeError> {
        let id = match id {
            Some(id) => id,
            None => WorkerId::new(coord.incr(keys::WORKERS_INDEX).await?),
        };
        let env = WorkerEnv {
            worker_id: id,
            run_root: config.run_dir.clone(),
            file_loader: FileLoader::new(coord.clone()),
        };
        Ok(Arc::new(Self {
            id,
            coord,
            policy,
            registry,
            env,
            config,
            running: Mutex::new(None),
        }))
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn env(&self) -> &WorkerEnv {
        &self.env
    }

    /// A queue-layer handle onto this worker.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle::new(self.id, self.coord.clone(), self.policy.clone())
    }

    /// Register, start the executors, start the heartbeat.
    pub async fn start(&self) -> Result<(), NodeError> {
        if self.running.lock().is_some() {
            return Err(NodeError::LifecycleState("worker already running"));
        }
        tokio::fs::create_dir_all(&self.config.run_dir).await?;

        let mut queues = Vec::with_capacity(self.config.queues.len());
        for name in &self.config.queues {
            queues.push(Queue::open(name.clone(), self.coord.clone()).await?);
        }
        let watcher = Arc::new(QueueWatcher::new(self.handle(), queues));
        let manager = Arc::new(ProcessingManager::new(self.env.clone(), self.registry.clone()));

        // Liveness goes up before the first executor can reserve:
        // a check-in from a worker without its key would be dropped.
        self.register().await?;

        let pool = WorkerPool::start(
            self.config.executors,
            watcher,
            manager,
            self.config.reserve_timeout,
        );

        let purger = Arc::new(WorkerPurger {
            coord: self.coord.clone(),
            id: self.id,
            ttl: self.policy.worker_ttl(),
        });
        let heartbeat = Heartbeat::new(
            self.coord.clone(),
            self.id.to_string(),
            self.policy.worker_ttl(),
            self.policy.heartbeat_interval(),
        )
        .prefix(keys::WORKER_PREFIX)
        .value("1")
        .reap(keys::WORKERS_SET, purger)
        .spawn();

        *self.running.lock() = Some(RunningWorker { heartbeat, pool });
        info!(worker_id = %self.id, executors = self.config.executors, "worker started");
        Ok(())
    }

    /// Drain the pool, then unregister and stop the heartbeat.
    ///
    /// The pool drains first so in-flight tasks check in while the
    /// worker is still alive; a clean shutdown leaves
    /// `worker:<id>:working` empty.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        let Some(running) = self.running.lock().take() else {
            return Err(NodeError::LifecycleState("worker not running"));
        };
        running.pool.signal_stop_intent();
        running.pool.shutdown().await;
        self.unregister().await?;
        running.heartbeat.stop().await;
        self.cleanup_run_dirs().await;
        info!(worker_id = %self.id, "worker stopped");
        Ok(())
    }

    async fn register(&self) -> Result<(), NodeError> {
        self.coord
            .set_with_ttl(&keys::worker(self.id), "1", self.policy.worker_ttl())
            .await?;
        self.coord
            .set_add(keys::WORKERS_SET, &self.id.to_string())
            .await?;
        Ok(())
    }

    async fn unregister(&self) -> Result<(), NodeError> {
        self.coord
            .set_remove(keys::WORKERS_SET, &self.id.to_string())
            .await?;
        self.coord.delete(&keys::worker(self.id)).await?;
        Ok(())
    }

    /// Force-remove any per-task run directories still lying around.
    async fn cleanup_run_dirs(&self) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.config.run_dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with("task.") {
                continue;
            }
            if let Err(e) = tokio::fs::remove_dir_all(entry.path()).await {
                warn!(dir = %entry.path().display(), error = %e, "lingering run dir removal failed");
            }
        }
    }
}

/// Reaper reactions for the workers set.
struct WorkerPurger {
    coord: Arc<dyn Coordinator>,
    id: WorkerId,
    ttl: Duration,
}

#[async_trait]
impl Purger for WorkerPurger {
    async fn purge_member(
        &self,
        coord: &Arc<dyn Coordinator>,
        _prefix: &str,
        member: &str,
        _postfix: &str,
    ) {
        let Ok(dead) = member.parse::<WorkerId>() else {
            warn!(%member, "unparseable member in workers set");
            return;
        };
        match requeue_dead_worker(coord, dead).await {
            Ok(count) => info!(dead_worker = %dead, requeued = count, "purged dead worker"),
            Err(e) => warn!(dead_worker = %dead, error = %e, "dead worker requeue failed"),
        }
    }

    async fn zombie(&self) {
        // Our TTL lapsed: peers may have requeued our in-flight tasks
        // already. Re-register and keep serving; duplicated execution
        // is within the at-least-once contract.
        warn!(worker_id = %self.id, "liveness lapsed, re-registering");
        let key = keys::worker(self.id);
        if let Err(e) = self.coord.set_with_ttl(&key, "1", self.ttl).await {
            warn!(worker_id = %self.id, error = %e, "re-registration failed");
        }
        if let Err(e) = self
            .coord
            .set_add(keys::WORKERS_SET, &self.id.to_string())
            .await
        {
            warn!(worker_id = %self.id, error = %e, "set re-add failed");
        }
    }
}

/// Requeue everything a dead worker had in flight.
///
/// For each id on `worker:<dead>:working`: drop it from its queue's
/// working list, clear the task's worker, and push it back onto
/// pending. The whole pass is idempotent — a crash mid-way leaves ids
/// that the next reaper pass (or a later purge of the same worker)
/// picks up.
pub async fn requeue_dead_worker(
    coord: &Arc<dyn Coordinator>,
    dead: WorkerId,
) -> Result<usize, NodeError> {
    let loader = TaskLoader::new(coord.clone());
    let working_key = keys::worker_working(dead);
    let mut requeued = 0;
    for raw in coord.list_range(&working_key, 0, -1).await? {
        let Ok(id) = raw.parse::<TaskId>() else {
            warn!(%raw, "unparseable task id on dead worker's working list");
            continue;
        };
        let mut task = match loader.load(id).await {
            Ok(task) => task,
            Err(e) => {
                warn!(task_id = %id, error = %e, "dead worker's task failed to load");
                continue;
            }
        };
        let Some(queue_name) = task.queue_name().map(str::to_string) else {
            warn!(task_id = %id, "dead worker's task has no queue");
            continue;
        };
        coord
            .list_remove(&keys::queue_working(&queue_name), -1, &raw)
            .await?;
        task.set_worker(None).await?;
        loader.enqueue(&mut task).await?;
        requeued += 1;
    }
    coord.delete(&working_key).await?;
    Ok(requeued)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
