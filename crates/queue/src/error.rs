// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and queue errors.

use sd_core::{IdParseError, TaskId};
use sd_coord::CoordError;
use thiserror::Error;

/// Errors around the task entity and its loader.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Loader operation on a task that has no loader attached yet.
    /// Programming error; fatal.
    #[error("LoaderNotSet")]
    LoaderNotSet,
    /// Operation that requires the task's queue to be known.
    /// Programming error; fatal.
    #[error("QueueNotSet")]
    QueueNotSet,
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task field {field} is writable only before registration")]
    Immutable { field: &'static str },
    #[error("task hash is missing field {0}")]
    MissingField(&'static str),
    #[error("unknown task field {0}")]
    UnknownField(String),
    #[error(transparent)]
    Id(#[from] IdParseError),
    #[error("payload encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No task became available in time. Benign; callers loop.
    #[error("queue reservation timed out")]
    Timeout,
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Coord(#[from] CoordError),
}
