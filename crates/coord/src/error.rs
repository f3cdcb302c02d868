// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator errors.

use thiserror::Error;

/// Errors surfaced by coordinator round-trips.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("coordinator error: {0}")]
    Redis(#[from] ::redis::RedisError),
    /// A stored value did not have the shape the caller required
    /// (e.g. a non-numeric counter).
    #[error("malformed value at {key}: {reason}")]
    Malformed { key: String, reason: String },
}

impl CoordError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed { key: key.into(), reason: reason.into() }
    }
}
