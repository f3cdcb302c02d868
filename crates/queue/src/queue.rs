// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A named queue and its four lists.
//!
//! `queue:<q>` holds pending task-ids; `queue:<q>:working` is the
//! single source of truth for in-flight ids; finished and failed ids
//! land on `queue:<q>:finished` and `queue:<q>:failed` when policy
//! stores them.

use crate::error::QueueError;
use crate::loader::TaskLoader;
use crate::reservation::Reservation;
use crate::task::Task;
use crate::worker_handle::WorkerHandle;
use sd_core::{keys, TaskId};
use sd_coord::Coordinator;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Handle to one queue.
#[derive(Clone)]
pub struct Queue {
    name: String,
    coord: Arc<dyn Coordinator>,
    loader: TaskLoader,
}

impl Queue {
    /// Open a queue, recording its name in the `queues` set.
    pub async fn open(name: impl Into<String>, coord: Arc<dyn Coordinator>) -> Result<Self, QueueError> {
        let name = name.into();
        coord.set_add(keys::QUEUES_SET, &name).await?;
        let loader = TaskLoader::new(coord.clone());
        Ok(Self { name, coord, loader })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loader(&self) -> &TaskLoader {
        &self.loader
    }

    /// Register the task (if needed) and push its id onto the pending
    /// list.
    pub async fn enqueue(&self, task: &mut Task) -> Result<TaskId, QueueError> {
        task.set_queue(&self.name).await?;
        let id = self.loader.register(task).await?;
        self.coord
            .push_front(&keys::queue_pending(&self.name), &id.to_string())
            .await?;
        debug!(queue = %self.name, task_id = %id, "enqueued task");
        Ok(id)
    }

    /// Atomically move the next pending task-id onto the working list
    /// and reserve it for `worker`.
    ///
    /// A zero timeout never blocks; otherwise the call blocks up to
    /// `timeout` (whole seconds). No task in time fails with
    /// [`QueueError::Timeout`].
    pub async fn reserve(
        &self,
        worker: &WorkerHandle,
        timeout: Duration,
    ) -> Result<Reservation, QueueError> {
        let pending = keys::queue_pending(&self.name);
        let working = keys::queue_working(&self.name);
        let moved = if timeout.is_zero() {
            self.coord.pop_push(&pending, &working).await?
        } else {
            self.coord.pop_push_blocking(&pending, &working, timeout).await?
        };
        let Some(raw) = moved else {
            return Err(QueueError::Timeout);
        };
        let id: TaskId = raw.parse().map_err(crate::error::TaskError::from)?;
        let mut task = self.loader.load(id).await?;
        task.set_worker(Some(worker.id())).await?;
        self.coord
            .push_front(&keys::worker_working(worker.id()), &raw)
            .await?;
        debug!(queue = %self.name, task_id = %id, worker_id = %worker.id(), "reserved task");
        Ok(Reservation::new(self.clone(), task, worker.clone()))
    }

    pub(crate) async fn remove_from_working(&self, id: TaskId) -> Result<(), QueueError> {
        self.coord
            .list_remove(&keys::queue_working(&self.name), -1, &id.to_string())
            .await?;
        Ok(())
    }

    pub(crate) async fn remove_from_worker_working(
        &self,
        worker: sd_core::WorkerId,
        id: TaskId,
    ) -> Result<(), QueueError> {
        self.coord
            .list_remove(&keys::worker_working(worker), -1, &id.to_string())
            .await?;
        Ok(())
    }

    pub(crate) async fn add_finished(&self, id: TaskId) -> Result<(), QueueError> {
        self.coord
            .push_front(&keys::queue_finished(&self.name), &id.to_string())
            .await?;
        Ok(())
    }

    pub(crate) async fn add_failed(&self, id: TaskId) -> Result<(), QueueError> {
        self.coord
            .push_front(&keys::queue_failed(&self.name), &id.to_string())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
