// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reservation object.
//!
//! Holding a reservation means: this worker removed the task from
//! pending, its id now sits on both `queue:<q>:working` and
//! `worker:<w>:working`, and this object is responsible for checking
//! it back in. Check-ins on a worker that is no longer alive are
//! no-ops — the task is then a reaper's to requeue.

use crate::error::QueueError;
use crate::queue::Queue;
use crate::task::Task;
use crate::worker_handle::WorkerHandle;
use sd_core::Failure;
use tracing::debug;

/// An in-flight task owned by one worker.
pub struct Reservation {
    queue: Queue,
    task: Task,
    worker: WorkerHandle,
}

impl Reservation {
    pub(crate) fn new(queue: Queue, task: Task, worker: WorkerHandle) -> Self {
        Self { queue, task, worker }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut Task {
        &mut self.task
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    /// Check the task in as finished: store it if policy wants it,
    /// then clear both working lists.
    pub async fn checkin_finished(mut self) -> Result<(), QueueError> {
        if !self.worker.is_alive().await? {
            debug!(worker_id = %self.worker.id(), "dropping check-in from dead worker");
            return Ok(());
        }
        let id = self.task.require_id()?;
        if self.worker.policy().store_finished_task() {
            self.queue.add_finished(id).await?;
        }
        self.clear_working_lists().await
    }

    /// Check the task in as failed.
    ///
    /// With `requeue` and policy approval the task goes back onto
    /// pending (worker cleared); otherwise it is terminal and stored on
    /// the failed list if policy wants it. The failure passed here must
    /// already be appended to the task — the failure count the policy
    /// sees includes it.
    ///
    /// Requeue pushes before the working lists are cleared: a crash in
    /// between duplicates the id rather than losing it, in line with
    /// the at-least-once contract.
    pub async fn checkin_failed(
        mut self,
        failure: &Failure,
        requeue: bool,
    ) -> Result<(), QueueError> {
        if !self.worker.is_alive().await? {
            debug!(worker_id = %self.worker.id(), "dropping check-in from dead worker");
            return Ok(());
        }
        let id = self.task.require_id()?;
        let failure_count = self.task.failures().await?.len();
        if requeue && self.worker.policy().requeue_after_failure(failure_count, failure) {
            debug!(task_id = %id, failure_count, "requeueing failed task");
            self.task.set_worker(None).await?;
            self.queue.enqueue(&mut self.task).await?;
        } else if self.worker.policy().store_failed_task(failure) {
            debug!(task_id = %id, failure_count, "storing terminally failed task");
            self.queue.add_failed(id).await?;
        }
        self.clear_working_lists().await
    }

    async fn clear_working_lists(&mut self) -> Result<(), QueueError> {
        let id = self.task.require_id()?;
        self.queue.remove_from_working(id).await?;
        self.queue
            .remove_from_worker_working(self.worker.id(), id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "reservation_tests.rs"]
mod tests;
