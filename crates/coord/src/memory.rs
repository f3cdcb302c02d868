// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordinator for tests.
//!
//! Implements the full primitive surface, including TTL expiry driven
//! by a [`Clock`], so queue, heartbeat, and registry behavior can be
//! exercised without a live Redis. Blocking pops poll; tests that
//! exercise them should use short real timeouts.

use crate::coordinator::Coordinator;
use crate::error::CoordError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use sd_core::clock::{Clock, SystemClock};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BLOCK_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    List(VecDeque<String>),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    expiry: HashMap<String, Instant>,
}

impl State {
    fn purge_expired(&mut self, now: Instant) {
        let dead: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in dead {
            self.expiry.remove(&key);
            self.entries.remove(&key);
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<&mut VecDeque<String>, CoordError> {
        match self.entries.entry(key.to_string()).or_insert_with(|| Entry::List(VecDeque::new())) {
            Entry::List(list) => Ok(list),
            _ => Err(CoordError::malformed(key, "not a list")),
        }
    }

    fn hash_mut(&mut self, key: &str) -> Result<&mut HashMap<String, String>, CoordError> {
        match self.entries.entry(key.to_string()).or_insert_with(|| Entry::Hash(HashMap::new())) {
            Entry::Hash(hash) => Ok(hash),
            _ => Err(CoordError::malformed(key, "not a hash")),
        }
    }

    fn set_mut(&mut self, key: &str) -> Result<&mut BTreeSet<String>, CoordError> {
        match self.entries.entry(key.to_string()).or_insert_with(|| Entry::Set(BTreeSet::new())) {
            Entry::Set(set) => Ok(set),
            _ => Err(CoordError::malformed(key, "not a set")),
        }
    }

    /// Drop a container entry once it becomes empty, matching the
    /// store's key-disappears-when-empty semantics.
    fn drop_if_empty(&mut self, key: &str) {
        let empty = match self.entries.get(key) {
            Some(Entry::List(list)) => list.is_empty(),
            Some(Entry::Set(set)) => set.is_empty(),
            Some(Entry::Hash(hash)) => hash.is_empty(),
            _ => false,
        };
        if empty {
            self.entries.remove(key);
            self.expiry.remove(key);
        }
    }
}

/// Shared in-memory store; clones see the same data.
#[derive(Clone)]
pub struct MemoryCoordinator<C: Clock = SystemClock> {
    state: Arc<Mutex<State>>,
    clock: C,
}

impl MemoryCoordinator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryCoordinator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryCoordinator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { state: Arc::new(Mutex::new(State::default())), clock }
    }

    fn locked(&self) -> parking_lot::MutexGuard<'_, State> {
        let mut state = self.state.lock();
        state.purge_expired(self.clock.now());
        state
    }
}

#[async_trait]
impl<C: Clock> Coordinator for MemoryCoordinator<C> {
    async fn incr(&self, key: &str) -> Result<u64, CoordError> {
        let mut state = self.locked();
        let current = match state.entries.get(key) {
            Some(Entry::Str(s)) => s
                .parse::<u64>()
                .map_err(|_| CoordError::malformed(key, "non-numeric counter"))?,
            Some(_) => return Err(CoordError::malformed(key, "not a counter")),
            None => 0,
        };
        let next = current + 1;
        state.entries.insert(key.to_string(), Entry::Str(next.to_string()));
        Ok(next)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CoordError> {
        let mut state = self.locked();
        state.hash_mut(key)?.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_multiple(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), CoordError> {
        let mut state = self.locked();
        let hash = state.hash_mut(key)?;
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordError> {
        let state = self.locked();
        match state.entries.get(key) {
            Some(Entry::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(CoordError::malformed(key, "not a hash")),
            None => Ok(HashMap::new()),
        }
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<(), CoordError> {
        let mut state = self.locked();
        state.list_mut(key)?.push_front(value.to_string());
        Ok(())
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<(), CoordError> {
        let mut state = self.locked();
        state.list_mut(key)?.push_back(value.to_string());
        Ok(())
    }

    async fn pop_push(&self, source: &str, dest: &str) -> Result<Option<String>, CoordError> {
        let mut state = self.locked();
        let popped = state.list_mut(source)?.pop_back();
        let Some(value) = popped else {
            state.drop_if_empty(source);
            return Ok(None);
        };
        state.drop_if_empty(source);
        state.list_mut(dest)?.push_front(value.clone());
        Ok(Some(value))
    }

    async fn pop_push_blocking(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CoordError> {
        let deadline =
            (!timeout.is_zero()).then(|| tokio::time::Instant::now() + timeout);
        loop {
            if let Some(value) = self.pop_push(source, dest).await? {
                return Ok(Some(value));
            }
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    return Ok(None);
                }
            }
            tokio::time::sleep(BLOCK_POLL).await;
        }
    }

    async fn list_remove(
        &self,
        key: &str,
        occurrences: isize,
        value: &str,
    ) -> Result<usize, CoordError> {
        let mut state = self.locked();
        let list = state.list_mut(key)?;
        let limit = if occurrences == 0 { usize::MAX } else { occurrences.unsigned_abs() };
        let mut removed = 0;
        if occurrences < 0 {
            // Scan from the tail.
            let mut index = list.len();
            while index > 0 {
                index -= 1;
                if removed >= limit {
                    break;
                }
                if list.get(index).is_some_and(|v| v == value) {
                    list.remove(index);
                    removed += 1;
                }
            }
        } else {
            let mut index = 0;
            while index < list.len() {
                if removed >= limit {
                    break;
                }
                if list.get(index).is_some_and(|v| v == value) {
                    list.remove(index);
                    removed += 1;
                } else {
                    index += 1;
                }
            }
        }
        state.drop_if_empty(key);
        Ok(removed)
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CoordError> {
        let state = self.locked();
        let list = match state.entries.get(key) {
            Some(Entry::List(list)) => list,
            Some(_) => return Err(CoordError::malformed(key, "not a list")),
            None => return Ok(Vec::new()),
        };
        let len = list.len() as isize;
        let clamp = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i.min(len - 1)
            }
        };
        if len == 0 {
            return Ok(Vec::new());
        }
        let (start, stop) = (clamp(start), clamp(stop));
        if start > stop {
            return Ok(Vec::new());
        }
        Ok((start..=stop)
            .filter_map(|i| list.get(i as usize).cloned())
            .collect())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CoordError> {
        let mut state = self.locked();
        Ok(state.set_mut(key)?.insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CoordError> {
        let mut state = self.locked();
        let removed = state.set_mut(key)?.remove(member);
        state.drop_if_empty(key);
        Ok(removed)
    }

    async fn set_len(&self, key: &str) -> Result<usize, CoordError> {
        let state = self.locked();
        match state.entries.get(key) {
            Some(Entry::Set(set)) => Ok(set.len()),
            Some(_) => Err(CoordError::malformed(key, "not a set")),
            None => Ok(0),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordError> {
        let state = self.locked();
        match state.entries.get(key) {
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(CoordError::malformed(key, "not a set")),
            None => Ok(Vec::new()),
        }
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, CoordError> {
        let state = self.locked();
        match state.entries.get(key) {
            Some(Entry::Set(set)) => Ok(set.iter().choose(&mut rand::rng()).cloned()),
            Some(_) => Err(CoordError::malformed(key, "not a set")),
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, CoordError> {
        Ok(self.locked().entries.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), CoordError> {
        let mut state = self.locked();
        state.entries.remove(key);
        state.expiry.remove(key);
        Ok(())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordError> {
        let mut state = self.locked();
        state.entries.insert(key.to_string(), Entry::Str(value.to_string()));
        state.expiry.insert(key.to_string(), self.clock.now() + ttl);
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordError> {
        let mut state = self.locked();
        if state.entries.contains_key(key) {
            return Ok(false);
        }
        state.entries.insert(key.to_string(), Entry::Str(value.to_string()));
        state.expiry.insert(key.to_string(), self.clock.now() + ttl);
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CoordError> {
        let mut state = self.locked();
        if !state.entries.contains_key(key) {
            return Ok(false);
        }
        state.expiry.insert(key.to_string(), self.clock.now() + ttl);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
