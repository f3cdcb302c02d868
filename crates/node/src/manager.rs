// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs processors against reservations and classifies their
//! failures.
//!
//! The classification is fixed: unresolvable names become
//! `UnknownProcessor`, declared failures become `ProcessingException`
//! with the processor's requeue opinion, anything unexpected during
//! construction is `InitException` and during execution `Exception`,
//! both terminal by default. The per-task run directory is removed at
//! the end no matter what.

use crate::processor::{Processor, ProcessorError, WorkerEnv};
use crate::registry::ProcessorRegistry;
use parking_lot::Mutex;
use sd_core::{Failure, FailureKind};
use sd_queue::{QueueError, Reservation};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One manager per worker; caches processor instances by resolved
/// name.
pub struct ProcessingManager {
    env: WorkerEnv,
    registry: Arc<ProcessorRegistry>,
    cache: Mutex<HashMap<String, Arc<dyn Processor>>>,
}

enum Instantiate {
    Ready(Arc<dyn Processor>),
    Failed { failure: Failure, requeue: bool },
}

impl ProcessingManager {
    pub fn new(env: WorkerEnv, registry: Arc<ProcessorRegistry>) -> Self {
        Self { env, registry, cache: Mutex::new(HashMap::new()) }
    }

    /// Run one reservation to completion and check it back in.
    ///
    /// Errors here are coordinator/check-in failures; processor
    /// failures are converted into task failures instead of
    /// propagating.
    pub async fn process(&self, mut reservation: Reservation) -> Result<(), QueueError> {
        let task_id = reservation.task().id();
        let queue_name = reservation.queue().name().to_string();
        let name = reservation.task().processor().unwrap_or_default().to_string();

        let outcome = match self.instantiate(&name) {
            Instantiate::Failed { failure, requeue } => Some((failure, requeue)),
            Instantiate::Ready(processor) => {
                match processor.process(reservation.task_mut()).await {
                    Ok(()) => None,
                    Err(ProcessorError::Processing { message, requeue }) => {
                        warn!(
                            task_id = ?task_id,
                            processor = %name,
                            %message,
                            "processing exception during execution"
                        );
                        Some((
                            Failure::new(FailureKind::ProcessingException, message),
                            requeue,
                        ))
                    }
                    Err(ProcessorError::Unexpected(message)) => {
                        error!(
                            task_id = ?task_id,
                            processor = %name,
                            %message,
                            "unexpected exception during execution"
                        );
                        Some((Failure::new(FailureKind::Exception, message), false))
                    }
                }
            }
        };

        let checkin = match outcome {
            None => {
                info!(
                    task_id = ?task_id,
                    queue = %queue_name,
                    processor = %name,
                    "successfully processed task"
                );
                reservation.checkin_finished().await
            }
            Some((failure, requeue)) => {
                reservation.task_mut().add_failure(failure.clone()).await?;
                reservation.checkin_failed(&failure, requeue).await
            }
        };

        if let Some(id) = task_id {
            self.env.cleanup_task_dir(id).await;
        }
        checkin
    }

    /// Resolve and construct the processor, classifying both kinds of
    /// failure.
    fn instantiate(&self, name: &str) -> Instantiate {
        if let Some(processor) = self.cache.lock().get(name) {
            return Instantiate::Ready(processor.clone());
        }
        let factory = match self.registry.resolve(name) {
            Ok(factory) => factory,
            Err(e) => {
                warn!(processor = %name, error = %e, "couldn't resolve processor");
                return Instantiate::Failed {
                    failure: Failure::new(FailureKind::UnknownProcessor, e.to_string()),
                    requeue: false,
                };
            }
        };
        match factory(&self.env) {
            Ok(processor) => {
                self.cache.lock().insert(name.to_string(), processor.clone());
                Instantiate::Ready(processor)
            }
            Err(ProcessorError::Processing { message, requeue }) => {
                warn!(processor = %name, %message, "processing exception during initialisation");
                Instantiate::Failed {
                    failure: Failure::new(FailureKind::ProcessingException, message),
                    requeue,
                }
            }
            Err(ProcessorError::Unexpected(message)) => {
                error!(processor = %name, %message, "exception during initialisation");
                Instantiate::Failed {
                    failure: Failure::new(FailureKind::InitException, message),
                    requeue: false,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
