// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory coordinator locks.
//!
//! These serialize registry updates best-effort. They are TTL-bounded
//! so a crashed holder cannot deadlock its peers; a waiter that
//! outlives the TTL takes the lock over. Treat them as advisory only —
//! correctness never depends on them.

use crate::coordinator::Coordinator;
use crate::error::CoordError;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default TTL for registry advisory locks.
pub const LOCK_TTL: Duration = Duration::from_millis(500);
/// Poll interval while waiting for a lock.
pub const LOCK_POLL: Duration = Duration::from_millis(100);

/// A named advisory lock in the coordinator.
pub struct CoordLock {
    coord: Arc<dyn Coordinator>,
    key: String,
    ttl: Duration,
    poll: Duration,
}

impl CoordLock {
    pub fn new(coord: Arc<dyn Coordinator>, key: impl Into<String>) -> Self {
        Self { coord, key: key.into(), ttl: LOCK_TTL, poll: LOCK_POLL }
    }

    pub fn with_timing(mut self, ttl: Duration, poll: Duration) -> Self {
        self.ttl = ttl;
        self.poll = poll;
        self
    }

    /// Acquire the lock, waiting at most one TTL for the current holder.
    ///
    /// If the holder does not release in time its TTL is considered
    /// lapsed and the lock is taken over.
    pub async fn acquire(self) -> Result<LockGuard, CoordError> {
        let deadline = tokio::time::Instant::now() + self.ttl;
        loop {
            if self.coord.set_if_absent_with_ttl(&self.key, "1", self.ttl).await? {
                return Ok(LockGuard { coord: self.coord, key: self.key });
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(key = %self.key, "lock holder overstayed ttl, taking over");
                self.coord.set_with_ttl(&self.key, "1", self.ttl).await?;
                return Ok(LockGuard { coord: self.coord, key: self.key });
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Held advisory lock. Must be released explicitly; if the holder dies
/// first the TTL releases it.
pub struct LockGuard {
    coord: Arc<dyn Coordinator>,
    key: String,
}

impl LockGuard {
    pub async fn release(self) -> Result<(), CoordError> {
        self.coord.delete(&self.key).await
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
