// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-issued integer ids.
//!
//! Every entity id is allocated by an atomic increment of a per-entity
//! counter key (`files:index`, `hosts:index`, `workers:index`,
//! `tasks:index`) and travels as a decimal string in list members and
//! hash fields.

use thiserror::Error;

/// A string that should have been a decimal id but wasn't.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct IdParseError {
    kind: &'static str,
    value: String,
}

impl IdParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

crate::counter_id! {
    /// Id of a file descriptor in the registry (counter `files:index`).
    pub struct FileId;
}

crate::counter_id! {
    /// Id of a host serving files (counter `hosts:index`).
    pub struct HostId;
}

crate::counter_id! {
    /// Id of a worker process (counter `workers:index`).
    pub struct WorkerId;
}

crate::counter_id! {
    /// Id of a task (counter `tasks:index`).
    pub struct TaskId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
