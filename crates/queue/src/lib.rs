// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sd-queue: Task model and the queue-reservation protocol.
//!
//! A task is serialized as the `task:<id>` hash plus side-lists for
//! input files, output files, and failures. Reservation is the atomic
//! right-pop-left-push from a queue's pending list to its working
//! list; the [`Reservation`] object is responsible for checking the
//! task back in, finished or failed.

pub mod error;
pub mod loader;
pub mod queue;
pub mod reservation;
pub mod task;
pub mod watcher;
pub mod worker_handle;

pub use error::{QueueError, TaskError};
pub use loader::TaskLoader;
pub use queue::Queue;
pub use reservation::Reservation;
pub use task::Task;
pub use watcher::QueueWatcher;
pub use worker_handle::WorkerHandle;
