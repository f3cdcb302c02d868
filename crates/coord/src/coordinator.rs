// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator primitive surface.
//!
//! Deliberately low-level: exactly the atomic operations the shared
//! store offers, nothing composed. Multi-step updates are best-effort
//! with idempotent retry semantics documented at each use-site; no
//! cross-key transactions are assumed anywhere.

use crate::error::CoordError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Typed wrapper over the shared key-value store.
///
/// All components take an `Arc<dyn Coordinator>` handle; process-local
/// shared state is forbidden.
#[async_trait]
pub trait Coordinator: Send + Sync + 'static {
    /// Atomically increment a counter key, returning the new value.
    /// Missing keys start at zero.
    async fn incr(&self, key: &str) -> Result<u64, CoordError>;

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CoordError>;

    async fn hash_set_multiple(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), CoordError>;

    /// Read a whole hash. Missing keys come back as an empty map.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordError>;

    /// Left-push onto a list (new head).
    async fn push_front(&self, key: &str, value: &str) -> Result<(), CoordError>;

    /// Right-push onto a list (new tail).
    async fn push_back(&self, key: &str, value: &str) -> Result<(), CoordError>;

    /// Atomic right-pop-left-push: move the tail of `source` to the
    /// head of `dest`. `None` when `source` is empty.
    async fn pop_push(&self, source: &str, dest: &str) -> Result<Option<String>, CoordError>;

    /// Blocking variant of [`Coordinator::pop_push`]. Waits up to
    /// `timeout` (whole seconds granularity; zero blocks indefinitely)
    /// before returning `None`.
    async fn pop_push_blocking(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CoordError>;

    /// Remove occurrences of `value` from a list. Negative `occurrences`
    /// scans from the tail; the magnitude bounds how many entries are
    /// removed. Returns how many were removed.
    async fn list_remove(
        &self,
        key: &str,
        occurrences: isize,
        value: &str,
    ) -> Result<usize, CoordError>;

    /// Inclusive range read; `(0, -1)` reads the whole list.
    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CoordError>;

    /// Returns true when the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CoordError>;

    /// Returns true when the member was present and removed. The
    /// reaper relies on this to serialize purges across peers.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CoordError>;

    async fn set_len(&self, key: &str) -> Result<usize, CoordError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordError>;

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, CoordError>;

    async fn exists(&self, key: &str) -> Result<bool, CoordError>;

    async fn delete(&self, key: &str) -> Result<(), CoordError>;

    /// Set a string value with a TTL (SETEX).
    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordError>;

    /// Set a string value with a TTL only if the key does not exist
    /// (SET NX EX). Returns true when the key was set.
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordError>;

    /// Refresh the TTL on an existing key. Returns false when the key
    /// does not exist — the caller just turned out to be a zombie.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CoordError>;
}

/// Whole seconds, rounded up so sub-second TTLs don't collapse to zero.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
