// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-queue polling for a worker.
//!
//! Queue order is priority order: every pass tries each queue in
//! declaration order with a non-blocking reservation, so an item on an
//! earlier queue always wins a tie. A watcher over exactly one queue
//! skips the polling and blocks on the store directly.

use crate::error::QueueError;
use crate::queue::Queue;
use crate::reservation::Reservation;
use crate::worker_handle::WorkerHandle;
use std::time::Duration;

/// Default sleep between polling passes.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// Polls an ordered list of queues on behalf of one worker.
pub struct QueueWatcher {
    worker: WorkerHandle,
    queues: Vec<Queue>,
    wait: Duration,
}

impl QueueWatcher {
    pub fn new(worker: WorkerHandle, queues: Vec<Queue>) -> Self {
        Self { worker, queues, wait: DEFAULT_WAIT }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Append a queue at the lowest priority.
    pub fn add_queue(&mut self, queue: Queue) {
        self.queues.push(queue);
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    /// Reserve the next task from any queue, in priority order.
    ///
    /// A zero timeout makes a single non-blocking pass. Otherwise the
    /// watcher polls until the deadline and fails with
    /// [`QueueError::Timeout`].
    pub async fn reserve(&self, timeout: Duration) -> Result<Reservation, QueueError> {
        if self.queues.len() == 1 && !timeout.is_zero() {
            if let [queue] = self.queues.as_slice() {
                return queue.reserve(&self.worker, timeout).await;
            }
        }

        let deadline = (!timeout.is_zero()).then(|| tokio::time::Instant::now() + timeout);
        loop {
            match self.try_each_queue().await {
                Err(QueueError::Timeout) => {}
                other => return other,
            }
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    return Err(QueueError::Timeout);
                }
            } else if timeout.is_zero() {
                return Err(QueueError::Timeout);
            }
            tokio::time::sleep(self.wait).await;
        }
    }

    async fn try_each_queue(&self) -> Result<Reservation, QueueError> {
        for queue in &self.queues {
            match queue.reserve(&self.worker, Duration::ZERO).await {
                Err(QueueError::Timeout) => continue,
                other => return other,
            }
        }
        Err(QueueError::Timeout)
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
