// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The slice of a worker that the queue layer needs: identity,
//! liveness, and policy.

use sd_core::{keys, Policy, WorkerId};
use sd_coord::{CoordError, Coordinator};
use std::sync::Arc;

/// Handle onto a worker, held by reservations for their check-in
/// decisions.
#[derive(Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    coord: Arc<dyn Coordinator>,
    policy: Arc<dyn Policy>,
}

impl WorkerHandle {
    pub fn new(id: WorkerId, coord: Arc<dyn Coordinator>, policy: Arc<dyn Policy>) -> Self {
        Self { id, coord, policy }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn policy(&self) -> &dyn Policy {
        self.policy.as_ref()
    }

    /// Liveness is the existence of the TTL-bounded `worker:<id>` key.
    /// A worker whose key lapsed must treat itself as dead: a reaper
    /// may already be requeueing its in-flight tasks.
    pub async fn is_alive(&self) -> Result<bool, CoordError> {
        self.coord.exists(&keys::worker(self.id)).await
    }
}
