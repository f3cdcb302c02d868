// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task persistence against the coordinator.

use crate::error::TaskError;
use crate::task::Task;
use sd_core::{keys, Failure, FileId, TaskId};
use sd_coord::Coordinator;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads and writes tasks under `task:<id>` and its side-lists.
///
/// Cloning is cheap; a loader is attached to every task it registers
/// or loads so the task can write through on later mutations.
#[derive(Clone)]
pub struct TaskLoader {
    coord: Arc<dyn Coordinator>,
}

impl TaskLoader {
    pub fn new(coord: Arc<dyn Coordinator>) -> Self {
        Self { coord }
    }

    pub fn coordinator(&self) -> &Arc<dyn Coordinator> {
        &self.coord
    }

    /// Register a task: allocate its id if absent, write the hash, and
    /// push the side-lists. Idempotent for already-registered tasks.
    pub async fn register(&self, task: &mut Task) -> Result<TaskId, TaskError> {
        if task.registered {
            return task.require_id();
        }
        if task.loader.is_none() {
            task.loader = Some(self.clone());
        }
        let id = match task.id {
            Some(id) => id,
            None => TaskId::new(self.coord.incr(keys::TASKS_INDEX).await?),
        };
        task.id = Some(id);
        self.coord
            .hash_set_multiple(&keys::task(id), &task.export_fields()?)
            .await?;
        for file in task.in_files.clone().unwrap_or_default() {
            self.coord
                .push_back(&keys::task_infiles(id), &file.to_string())
                .await?;
        }
        for file in task.out_files.clone().unwrap_or_default() {
            self.coord
                .push_back(&keys::task_outfiles(id), &file.to_string())
                .await?;
        }
        for failure in task.failures.clone().unwrap_or_default() {
            self.add_failure(id, &failure).await?;
        }
        task.registered = true;
        Ok(id)
    }

    /// Push a task onto the queue it already names, registering it
    /// first when needed. Fails with `QueueNotSet` if the task has no
    /// queue.
    pub async fn enqueue(&self, task: &mut Task) -> Result<TaskId, TaskError> {
        let queue_name = task.require_queue()?.to_string();
        let id = self.register(task).await?;
        self.coord.set_add(keys::QUEUES_SET, &queue_name).await?;
        self.coord
            .push_front(&keys::queue_pending(&queue_name), &id.to_string())
            .await?;
        Ok(id)
    }

    /// Load a registered task by id.
    pub async fn load(&self, id: TaskId) -> Result<Task, TaskError> {
        let hash = self.coord.hash_get_all(&keys::task(id)).await?;
        if hash.is_empty() {
            return Err(TaskError::NotFound(id));
        }
        Task::from_hash(&hash, self.clone())
    }

    /// Write one scalar field of a registered task back to its hash.
    /// A cleared worker is stored as the empty string.
    pub(crate) async fn update_field(&self, task: &Task, field: &str) -> Result<(), TaskError> {
        let id = task.require_id()?;
        let value = match field {
            "queue" => task.queue.clone().unwrap_or_default(),
            "worker" => task.worker.map(|w| w.to_string()).unwrap_or_default(),
            "processor" => task.processor.clone().unwrap_or_default(),
            "batch" => task.batch.clone().unwrap_or_default(),
            "payload" => serde_json::to_string(&task.payload)?,
            other => return Err(TaskError::UnknownField(other.to_string())),
        };
        self.coord.hash_set(&keys::task(id), field, &value).await?;
        Ok(())
    }

    pub async fn add_failure(&self, id: TaskId, failure: &Failure) -> Result<(), TaskError> {
        let encoded = serde_json::to_string(failure)?;
        self.coord
            .push_back(&keys::task_failures(id), &encoded)
            .await?;
        Ok(())
    }

    pub async fn load_failures(&self, id: TaskId) -> Result<Vec<Failure>, TaskError> {
        let raw = self
            .coord
            .list_range(&keys::task_failures(id), 0, -1)
            .await?;
        raw.iter()
            .map(|entry| serde_json::from_str(entry).map_err(TaskError::from))
            .collect()
    }

    pub async fn add_in_file(&self, id: TaskId, file: FileId) -> Result<(), TaskError> {
        self.coord
            .push_back(&keys::task_infiles(id), &file.to_string())
            .await?;
        Ok(())
    }

    pub async fn add_out_file(&self, id: TaskId, file: FileId) -> Result<(), TaskError> {
        self.coord
            .push_back(&keys::task_outfiles(id), &file.to_string())
            .await?;
        Ok(())
    }

    pub async fn load_in_files(&self, id: TaskId) -> Result<Vec<FileId>, TaskError> {
        let raw = self.coord.list_range(&keys::task_infiles(id), 0, -1).await?;
        raw.iter()
            .map(|entry| entry.parse::<FileId>().map_err(TaskError::from))
            .collect()
    }

    pub async fn load_out_files(&self, id: TaskId) -> Result<Vec<FileId>, TaskError> {
        let raw = self
            .coord
            .list_range(&keys::task_outfiles(id), 0, -1)
            .await?;
        raw.iter()
            .map(|entry| entry.parse::<FileId>().map_err(TaskError::from))
            .collect()
    }

    pub async fn load_result(&self, id: TaskId) -> Result<HashMap<String, String>, TaskError> {
        Ok(self.coord.hash_get_all(&keys::task_result(id)).await?)
    }

    pub async fn store_result(
        &self,
        id: TaskId,
        result: &HashMap<String, String>,
    ) -> Result<(), TaskError> {
        let fields: Vec<(String, String)> =
            result.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.coord
            .hash_set_multiple(&keys::task_result(id), &fields)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
