// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed-size executor pool.
//!
//! Each executor loops on the queue watcher: reservation timeouts just
//! mean "no work"; a reservation is handed to the processing manager
//! and runs to completion. Cancellation is cooperative — the stop flag
//! is observed between reservations, so shutdown completes within one
//! reservation timeout plus the in-flight task.

use crate::manager::ProcessingManager;
use sd_queue::{QueueError, QueueWatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backoff after an unexpected reservation error, so a flapping
/// coordinator doesn't spin the executors.
const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// N executors around one watcher and one manager.
pub struct WorkerPool {
    cancel: CancellationToken,
    executors: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(
        size: usize,
        watcher: Arc<QueueWatcher>,
        manager: Arc<ProcessingManager>,
        reserve_timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let executors = (0..size)
            .map(|index| {
                let watcher = watcher.clone();
                let manager = manager.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    executor_loop(index, watcher, manager, cancel, reserve_timeout).await;
                })
            })
            .collect();
        Self { cancel, executors }
    }

    pub fn size(&self) -> usize {
        self.executors.len()
    }

    /// Flip the stop flag; executors exit between reservations.
    pub fn signal_stop_intent(&self) {
        self.cancel.cancel();
    }

    /// Signal and join every executor.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for executor in self.executors {
            if let Err(e) = executor.await {
                warn!(error = %e, "executor panicked");
            }
        }
    }
}

async fn executor_loop(
    index: usize,
    watcher: Arc<QueueWatcher>,
    manager: Arc<ProcessingManager>,
    cancel: CancellationToken,
    reserve_timeout: Duration,
) {
    debug!(executor = index, "executor started");
    while !cancel.is_cancelled() {
        match watcher.reserve(reserve_timeout).await {
            Ok(reservation) => {
                if let Err(e) = manager.process(reservation).await {
                    warn!(executor = index, error = %e, "check-in failed");
                }
            }
            Err(QueueError::Timeout) => continue,
            Err(e) => {
                warn!(executor = index, error = %e, "reservation failed");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
    debug!(executor = index, "executor stopped");
}
