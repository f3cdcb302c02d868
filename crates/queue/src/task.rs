// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task entity.
//!
//! Scalar fields live in the `task:<id>` hash; inFiles, outFiles, and
//! failures are side-lists loaded on first access once the task is
//! registered. Before registration everything is plain local state;
//! after registration scalar writes go through the loader, the file
//! lists are append-only, and failures are append-only.

use crate::error::TaskError;
use crate::loader::TaskLoader;
use sd_core::{Failure, FileId, TaskId, TaskPayload, WorkerId};
use std::collections::HashMap;

/// A unit of work on a queue.
pub struct Task {
    pub(crate) id: Option<TaskId>,
    pub(crate) queue: Option<String>,
    pub(crate) worker: Option<WorkerId>,
    pub(crate) processor: Option<String>,
    pub(crate) batch: Option<String>,
    pub(crate) payload: TaskPayload,
    pub(crate) in_files: Option<Vec<FileId>>,
    pub(crate) out_files: Option<Vec<FileId>>,
    pub(crate) failures: Option<Vec<Failure>>,
    pub(crate) result: Option<HashMap<String, String>>,
    pub(crate) loader: Option<TaskLoader>,
    pub(crate) registered: bool,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .field("worker", &self.worker)
            .field("processor", &self.processor)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// A fresh, unregistered task for the given processor.
    pub fn new(processor: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            id: None,
            queue: None,
            worker: None,
            processor: Some(processor.into()),
            batch: None,
            payload,
            in_files: None,
            out_files: None,
            failures: None,
            result: None,
            loader: None,
            registered: false,
        }
    }

    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    pub(crate) fn require_id(&self) -> Result<TaskId, TaskError> {
        self.id.ok_or(TaskError::MissingField("id"))
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    pub(crate) fn require_queue(&self) -> Result<&str, TaskError> {
        self.queue.as_deref().ok_or(TaskError::QueueNotSet)
    }

    pub fn worker(&self) -> Option<WorkerId> {
        self.worker
    }

    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    pub fn batch(&self) -> Option<&str> {
        self.batch.as_deref()
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    fn loader(&self) -> Result<&TaskLoader, TaskError> {
        self.loader.as_ref().ok_or(TaskError::LoaderNotSet)
    }

    /// Attach a loader without registering yet.
    pub fn attach_loader(&mut self, loader: TaskLoader) {
        self.loader = Some(loader);
    }

    /// Register through the attached loader.
    pub async fn register(&mut self) -> Result<TaskId, TaskError> {
        let loader = self.loader()?.clone();
        loader.register(self).await
    }

    /// Set the batch tag. Writable only before registration.
    pub fn set_batch(&mut self, batch: impl Into<String>) -> Result<(), TaskError> {
        if self.registered {
            return Err(TaskError::Immutable { field: "batch" });
        }
        self.batch = Some(batch.into());
        Ok(())
    }

    /// Replace the input file list. Writable only before registration;
    /// use [`Task::add_in_file`] afterwards.
    pub fn set_in_files(&mut self, files: Vec<FileId>) -> Result<(), TaskError> {
        if self.registered {
            return Err(TaskError::Immutable { field: "inFiles" });
        }
        self.in_files = Some(files);
        Ok(())
    }

    /// Replace the output file list. Writable only before registration.
    pub fn set_out_files(&mut self, files: Vec<FileId>) -> Result<(), TaskError> {
        if self.registered {
            return Err(TaskError::Immutable { field: "outFiles" });
        }
        self.out_files = Some(files);
        Ok(())
    }

    /// Assign or clear the owning worker, writing through once
    /// registered.
    pub async fn set_worker(&mut self, worker: Option<WorkerId>) -> Result<(), TaskError> {
        self.worker = worker;
        if self.registered {
            let loader = self.loader()?.clone();
            loader.update_field(self, "worker").await?;
        }
        Ok(())
    }

    /// Move the task onto a queue, writing through once registered.
    pub(crate) async fn set_queue(&mut self, queue: &str) -> Result<(), TaskError> {
        self.queue = Some(queue.to_string());
        if self.registered {
            let loader = self.loader()?.clone();
            loader.update_field(self, "queue").await?;
        }
        Ok(())
    }

    /// Input file ids, loaded on first access for a registered task.
    pub async fn in_files(&mut self) -> Result<&[FileId], TaskError> {
        if self.in_files.is_none() {
            self.in_files = Some(if self.registered {
                let loader = self.loader()?.clone();
                loader.load_in_files(self.require_id()?).await?
            } else {
                Vec::new()
            });
        }
        Ok(self.in_files.as_deref().unwrap_or_default())
    }

    /// Output file ids, loaded on first access for a registered task.
    pub async fn out_files(&mut self) -> Result<&[FileId], TaskError> {
        if self.out_files.is_none() {
            self.out_files = Some(if self.registered {
                let loader = self.loader()?.clone();
                loader.load_out_files(self.require_id()?).await?
            } else {
                Vec::new()
            });
        }
        Ok(self.out_files.as_deref().unwrap_or_default())
    }

    /// Append an input file id (append-only after registration).
    pub async fn add_in_file(&mut self, file: FileId) -> Result<(), TaskError> {
        self.in_files().await?;
        if let Some(files) = &mut self.in_files {
            files.push(file);
        }
        if self.registered {
            let loader = self.loader()?.clone();
            loader.add_in_file(self.require_id()?, file).await?;
        }
        Ok(())
    }

    /// Append an output file id (append-only after registration).
    pub async fn add_out_file(&mut self, file: FileId) -> Result<(), TaskError> {
        self.out_files().await?;
        if let Some(files) = &mut self.out_files {
            files.push(file);
        }
        if self.registered {
            let loader = self.loader()?.clone();
            loader.add_out_file(self.require_id()?, file).await?;
        }
        Ok(())
    }

    /// Failures recorded so far, oldest first.
    pub async fn failures(&mut self) -> Result<&[Failure], TaskError> {
        if self.failures.is_none() {
            self.failures = Some(if self.registered {
                let loader = self.loader()?.clone();
                loader.load_failures(self.require_id()?).await?
            } else {
                Vec::new()
            });
        }
        Ok(self.failures.as_deref().unwrap_or_default())
    }

    /// Append a failure (failures are append-only).
    pub async fn add_failure(&mut self, failure: Failure) -> Result<(), TaskError> {
        self.failures().await?;
        if self.registered {
            let loader = self.loader()?.clone();
            loader.add_failure(self.require_id()?, &failure).await?;
        }
        if let Some(failures) = &mut self.failures {
            failures.push(failure);
        }
        Ok(())
    }

    /// The task's result hash, loaded on first access.
    pub async fn result(&mut self) -> Result<&HashMap<String, String>, TaskError> {
        if self.result.is_none() {
            self.result = Some(if self.registered {
                let loader = self.loader()?.clone();
                loader.load_result(self.require_id()?).await?
            } else {
                HashMap::new()
            });
        }
        match &self.result {
            Some(result) => Ok(result),
            None => Err(TaskError::MissingField("result")),
        }
    }

    /// Replace the result hash, writing through once registered.
    pub async fn set_result(&mut self, result: HashMap<String, String>) -> Result<(), TaskError> {
        if self.registered {
            let loader = self.loader()?.clone();
            loader.store_result(self.require_id()?, &result).await?;
        }
        self.result = Some(result);
        Ok(())
    }

    /// Scalar fields as stored in the `task:<id>` hash.
    pub(crate) fn export_fields(&self) -> Result<Vec<(String, String)>, TaskError> {
        let mut fields = Vec::with_capacity(6);
        fields.push(("id".to_string(), self.require_id()?.to_string()));
        if let Some(queue) = &self.queue {
            fields.push(("queue".to_string(), queue.clone()));
        }
        if let Some(worker) = &self.worker {
            fields.push(("worker".to_string(), worker.to_string()));
        }
        if let Some(processor) = &self.processor {
            fields.push(("processor".to_string(), processor.clone()));
        }
        if let Some(batch) = &self.batch {
            fields.push(("batch".to_string(), batch.clone()));
        }
        fields.push(("payload".to_string(), serde_json::to_string(&self.payload)?));
        Ok(fields)
    }

    /// Rebuild a registered task from its hash.
    pub(crate) fn from_hash(
        hash: &HashMap<String, String>,
        loader: TaskLoader,
    ) -> Result<Self, TaskError> {
        let id = hash
            .get("id")
            .ok_or(TaskError::MissingField("id"))?
            .parse::<TaskId>()?;
        // A cleared worker is stored as the empty string.
        let worker = hash
            .get("worker")
            .filter(|w| !w.is_empty())
            .map(|w| w.parse::<WorkerId>())
            .transpose()?;
        let payload = match hash.get("payload") {
            Some(raw) => serde_json::from_str(raw)?,
            None => TaskPayload::default(),
        };
        Ok(Self {
            id: Some(id),
            queue: hash.get("queue").cloned(),
            worker,
            processor: hash.get("processor").cloned(),
            batch: hash.get("batch").cloned(),
            payload,
            in_files: None,
            out_files: None,
            failures: None,
            result: None,
            loader: Some(loader),
            registered: true,
        })
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
