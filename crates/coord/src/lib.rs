// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sd-coord: Typed access to the shared coordinator.
//!
//! The coordinator (Redis) is the only path to cross-process state.
//! This crate wraps its list, hash, set, string, and expiration
//! primitives behind the [`Coordinator`] trait, and builds the two
//! liveness mechanisms on top of them: advisory/write locks and the
//! heartbeat-plus-reaper loop.

pub mod coordinator;
pub mod error;
pub mod heartbeat;
pub mod lock;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod redis;

pub use coordinator::Coordinator;
pub use error::CoordError;
pub use heartbeat::{Heartbeat, HeartbeatHandle, Purger};
pub use lock::{CoordLock, LockGuard};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCoordinator;
pub use redis::{RedisConfig, RedisCoordinator};
