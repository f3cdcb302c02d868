// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task payloads and failures.
//!
//! The task entity itself lives in `sd-queue` next to its loader; this
//! module holds the parts that are pure data: the opaque payload handed
//! to processors and the failure records appended to
//! `task:<id>:failures`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque argument bundle carried by a task.
///
/// Stored as a single JSON string in the `payload` field of the
/// `task:<id>` hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl TaskPayload {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }
}

/// Classification of a task failure (spelled out in `Failure.type` on
/// the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Processor name did not resolve to anything runnable.
    UnknownProcessor,
    /// Processor-declared failure; the processor decides whether it is
    /// worth retrying.
    ProcessingException,
    /// Unexpected error while constructing the processor.
    InitException,
    /// Unexpected error while executing the processor.
    Exception,
}

impl FailureKind {
    /// Whether failures of this kind may be requeued at all. Only
    /// processor-declared failures carry a retry opinion; everything
    /// else is terminal unless policy says otherwise.
    pub fn requeueable(&self) -> bool {
        matches!(self, FailureKind::ProcessingException)
    }
}

crate::simple_display! {
    FailureKind {
        UnknownProcessor => "UnknownProcessor",
        ProcessingException => "ProcessingException",
        InitException => "InitException",
        Exception => "Exception",
    }
}

/// One failure of one task run, appended to `task:<id>:failures` as a
/// JSON string `{"type": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
