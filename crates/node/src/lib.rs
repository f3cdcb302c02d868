// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sd-node: The two long-running processes.
//!
//! A [`Worker`] runs N executors that reserve tasks, resolve their
//! processors, run them, and check the reservations back in. A
//! [`Host`] serves file payloads over HTTP from its bucket. Both
//! register themselves in the coordinator and heartbeat their liveness
//! keys.

pub mod config;
pub mod error;
pub mod host;
pub mod manager;
pub mod pool;
pub mod processor;
pub mod registry;
pub mod worker;

pub use config::{BackendConfig, Config};
pub use error::NodeError;
pub use host::{Host, HostConfig};
pub use manager::ProcessingManager;
pub use pool::WorkerPool;
pub use processor::{
    enqueue, enqueue_with_files, FileProcessor, Processor, ProcessorError, StagedFile, WithFiles,
    WorkerEnv,
};
pub use registry::{ProcessorFactory, ProcessorRegistry, ProcessorResolver, RegistryError};
pub use worker::{Worker, WorkerConfig};
