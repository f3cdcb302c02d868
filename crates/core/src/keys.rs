// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator key schema.
//!
//! Every key the system touches is built here, so the schema has exactly
//! one definition. Key layout:
//!
//! - counters: `files:index`, `hosts:index`, `workers:index`, `tasks:index`
//! - files: hash `file:<fid>`, set `file:<fid>:hosts`, advisory
//!   `file:<fid>:lock`, write-lock `file:<fid>:writelock`
//! - hosts: set `hosts`, hash `host:<hid>` (TTL-bounded)
//! - workers: set `workers`, key `worker:<wid>` (TTL-bounded), list
//!   `worker:<wid>:working`
//! - queues: set `queues`, lists `queue:<q>`, `queue:<q>:working`,
//!   `queue:<q>:finished`, `queue:<q>:failed`
//! - tasks: hash `task:<tid>`, lists `task:<tid>:infiles`, `:outfiles`,
//!   `:failures`, hash `task:<tid>:result`

use crate::id::{FileId, HostId, TaskId, WorkerId};

pub const FILES_INDEX: &str = "files:index";
pub const HOSTS_INDEX: &str = "hosts:index";
pub const WORKERS_INDEX: &str = "workers:index";
pub const TASKS_INDEX: &str = "tasks:index";

pub const HOSTS_SET: &str = "hosts";
pub const WORKERS_SET: &str = "workers";
pub const QUEUES_SET: &str = "queues";

/// Prefix/postfix pair for host liveness keys, as consumed by the
/// heartbeat reaper.
pub const HOST_PREFIX: &str = "host:";
/// Prefix/postfix pair for worker liveness keys.
pub const WORKER_PREFIX: &str = "worker:";

pub fn file(id: FileId) -> String {
    format!("file:{id}")
}

pub fn file_hosts(id: FileId) -> String {
    format!("file:{id}:hosts")
}

pub fn file_lock(id: FileId) -> String {
    format!("file:{id}:lock")
}

pub fn file_writelock(id: FileId) -> String {
    format!("file:{id}:writelock")
}

pub fn host(id: HostId) -> String {
    format!("host:{id}")
}

pub fn worker(id: WorkerId) -> String {
    format!("worker:{id}")
}

pub fn worker_working(id: WorkerId) -> String {
    format!("worker:{id}:working")
}

pub fn queue_pending(name: &str) -> String {
    format!("queue:{name}")
}

pub fn queue_working(name: &str) -> String {
    format!("queue:{name}:working")
}

pub fn queue_finished(name: &str) -> String {
    format!("queue:{name}:finished")
}

pub fn queue_failed(name: &str) -> String {
    format!("queue:{name}:failed")
}

pub fn task(id: TaskId) -> String {
    format!("task:{id}")
}

pub fn task_infiles(id: TaskId) -> String {
    format!("task:{id}:infiles")
}

pub fn task_outfiles(id: TaskId) -> String {
    format!("task:{id}:outfiles")
}

pub fn task_failures(id: TaskId) -> String {
    format!("task:{id}:failures")
}

pub fn task_result(id: TaskId) -> String {
    format!("task:{id}:result")
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
