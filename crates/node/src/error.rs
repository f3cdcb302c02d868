// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-level errors.

use sd_coord::CoordError;
use sd_files::BucketError;
use sd_queue::{QueueError, TaskError};
use thiserror::Error;

/// Errors from worker and host lifecycle operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Bucket(#[from] BucketError),
    #[error("node i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration: {0}")]
    Config(String),
    /// Start on an already-running node, or shutdown on a stopped one.
    #[error("{0}")]
    LifecycleState(&'static str),
}
