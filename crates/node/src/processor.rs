// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processor contract and the file-staging pipeline.
//!
//! A processor is user logic run against one task. Expected, retryable
//! problems come back as [`ProcessorError::Processing`] with a requeue
//! opinion; anything else is unexpected and terminal by default. The
//! [`WithFiles`] adapter wraps a [`FileProcessor`]: it stages the
//! task's input files into the per-task run directory, runs the user
//! logic, and uploads the outputs.

use async_trait::async_trait;
use sd_core::{FileId, TaskId, TaskPayload, WorkerId};
use sd_files::{FileLoader, FileLoaderError};
use sd_queue::{Queue, QueueError, Task, TaskError};
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// What a processor sees of its worker: identity, the run-directory
/// root, and the file loader.
#[derive(Clone)]
pub struct WorkerEnv {
    pub worker_id: WorkerId,
    pub run_root: PathBuf,
    pub file_loader: FileLoader,
}

impl WorkerEnv {
    /// Per-task run directory: `<runRoot>/task.<id>`.
    pub fn task_dir(&self, task: TaskId) -> PathBuf {
        self.run_root.join(format!("task.{task}"))
    }

    pub async fn create_task_dir(&self, task: TaskId) -> Result<PathBuf, std::io::Error> {
        let dir = self.task_dir(task);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Remove a task's run directory. Errors are logged, never raised.
    pub async fn cleanup_task_dir(&self, task: TaskId) {
        let dir = self.task_dir(task);
        if !dir.exists() {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            warn!(task_id = %task, dir = %dir.display(), error = %e, "run dir cleanup failed");
        } else {
            debug!(task_id = %task, dir = %dir.display(), "removed run dir");
        }
    }
}

/// Failure of a processor run.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Declared by the processor for expected, possibly retryable
    /// problems; `requeue` is its retry opinion, which policy still
    /// has to approve.
    #[error("{message}")]
    Processing { message: String, requeue: bool },
    /// Anything unexpected escaping user code. Terminal by default.
    #[error("{0}")]
    Unexpected(String),
}

impl ProcessorError {
    pub fn processing(message: impl Into<String>, requeue: bool) -> Self {
        Self::Processing { message: message.into(), requeue }
    }

    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<FileLoaderError> for ProcessorError {
    fn from(err: FileLoaderError) -> Self {
        Self::unexpected(err)
    }
}

impl From<TaskError> for ProcessorError {
    fn from(err: TaskError) -> Self {
        Self::unexpected(err)
    }
}

impl From<std::io::Error> for ProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err)
    }
}

/// User logic run against one reserved task.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, task: &mut Task) -> Result<(), ProcessorError>;
}

/// An input or output file staged in the task's run directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub id: FileId,
    pub name: String,
    pub path: PathBuf,
}

/// User logic over staged files. Wrap in [`WithFiles`] to get the
/// download/upload pipeline.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn perform(
        &self,
        args: &[Value],
        in_files: &[StagedFile],
        out_files: &[StagedFile],
        kwargs: &Map<String, Value>,
    ) -> Result<(), ProcessorError>;
}

/// Adapter that stages inputs before, and uploads outputs after, the
/// wrapped [`FileProcessor`] runs.
pub struct WithFiles<P> {
    inner: P,
    env: WorkerEnv,
}

impl<P> WithFiles<P> {
    pub fn new(inner: P, env: WorkerEnv) -> Self {
        Self { inner, env }
    }
}

#[async_trait]
impl<P: FileProcessor> Processor for WithFiles<P> {
    async fn process(&self, task: &mut Task) -> Result<(), ProcessorError> {
        let task_id = task
            .id()
            .ok_or_else(|| ProcessorError::unexpected("task has no id"))?;
        let run_dir = self.env.create_task_dir(task_id).await?;

        // Inputs are fetched in declared order into the run directory.
        let mut staged_in = Vec::new();
        for id in task.in_files().await?.to_vec() {
            let mut file = self.env.file_loader.get_file(id).await?;
            let path = run_dir.join(&file.name);
            file.download_to(&path).await?;
            staged_in.push(StagedFile { id, name: file.name, path });
        }

        // Outputs only get their target paths; the user logic fills
        // them in.
        let mut staged_out = Vec::new();
        for id in task.out_files().await?.to_vec() {
            let file = self.env.file_loader.get_file(id).await?;
            let path = run_dir.join(&file.name);
            staged_out.push(StagedFile { id, name: file.name, path });
        }

        let payload = task.payload().clone();
        self.inner
            .perform(&payload.args, &staged_in, &staged_out, &payload.kwargs)
            .await?;

        for file in &staged_out {
            self.env.file_loader.upload_from_path(file.id, &file.path).await?;
        }
        Ok(())
    }
}

/// Build and enqueue a task for a processor by its registered name.
pub async fn enqueue(
    queue: &Queue,
    processor: &str,
    payload: TaskPayload,
) -> Result<Task, QueueError> {
    let mut task = Task::new(processor, payload);
    queue.enqueue(&mut task).await?;
    Ok(task)
}

/// [`enqueue`] with input and output file lists.
pub async fn enqueue_with_files(
    queue: &Queue,
    processor: &str,
    payload: TaskPayload,
    in_files: Vec<FileId>,
    out_files: Vec<FileId>,
) -> Result<Task, QueueError> {
    let mut task = Task::new(processor, payload);
    task.set_in_files(in_files).map_err(QueueError::from)?;
    task.set_out_files(out_files).map_err(QueueError::from)?;
    queue.enqueue(&mut task).await?;
    Ok(task)
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
