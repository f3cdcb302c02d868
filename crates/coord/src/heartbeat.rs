// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness heartbeat and peer reaper.
//!
//! A heartbeat owns one key `<prefix><member><postfix>` with a TTL and
//! refreshes it every interval. When it also watches a membership set,
//! it periodically walks the set and purges members whose key lapsed.
//! Reaping is at-least-once across the fleet; the set-removal result
//! gates the purge hook so exactly one peer runs it per death.

use crate::coordinator::Coordinator;
use crate::error::CoordError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reactions to observed deaths.
#[async_trait]
pub trait Purger: Send + Sync + 'static {
    /// Called after this peer won the race to remove `member` from the
    /// membership set. Cleanup must tolerate being re-run: a crash
    /// mid-purge leaves the member gone but its keys behind, and the
    /// next death of the same id purges again.
    async fn purge_member(
        &self,
        coord: &Arc<dyn Coordinator>,
        prefix: &str,
        member: &str,
        postfix: &str,
    );

    /// Called when the own key lapsed before it could be refreshed: the
    /// TTL elapsed, so peers may already have reaped us. A transient
    /// coordinator failure is indistinguishable from a crash here; the
    /// reaction must be to re-register.
    async fn zombie(&self);
}

/// Periodic TTL refresh on one liveness key, with optional reaping of
/// a membership set.
pub struct Heartbeat {
    coord: Arc<dyn Coordinator>,
    prefix: String,
    member: String,
    postfix: String,
    ttl: Duration,
    interval: Duration,
    value: Option<String>,
    set_key: Option<String>,
    purger: Option<Arc<dyn Purger>>,
}

impl Heartbeat {
    pub fn new(
        coord: Arc<dyn Coordinator>,
        member: impl Into<String>,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            coord,
            prefix: String::new(),
            member: member.into(),
            postfix: String::new(),
            ttl,
            interval,
            value: None,
            set_key: None,
            purger: None,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    /// Value to SETEX at startup. Without it the key is assumed to be
    /// written by the owner already and only its TTL is refreshed.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Watch a membership set and reap dead peers from it.
    pub fn reap(mut self, set_key: impl Into<String>, purger: Arc<dyn Purger>) -> Self {
        self.set_key = Some(set_key.into());
        self.purger = Some(purger);
        self
    }

    fn own_key(&self) -> String {
        format!("{}{}{}", self.prefix, self.member, self.postfix)
    }

    /// Spawn the heartbeat loop as a task.
    pub fn spawn(self) -> HeartbeatHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        HeartbeatHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        let own_key = self.own_key();
        debug!(key = %own_key, "setting initial heartbeat expiration");
        let startup = match &self.value {
            Some(value) => self.coord.set_with_ttl(&own_key, value, self.ttl).await,
            None => self.coord.expire(&own_key, self.ttl).await.map(|_| ()),
        };
        if let Err(e) = startup {
            warn!(key = %own_key, error = %e, "heartbeat startup write failed");
        }

        // One reap pass every 5 × |set| refreshes, sized once like the
        // refresh cadence itself.
        let mut reap_after = None;
        if let Some(set_key) = &self.set_key {
            let size = self.coord.set_len(set_key).await.unwrap_or(0);
            reap_after = Some(size.saturating_mul(5));
        }
        let mut counter = 0usize;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match self.coord.expire(&own_key, self.ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(key = %own_key, "detected zombie: liveness key lapsed");
                    if let Some(purger) = &self.purger {
                        purger.zombie().await;
                    }
                }
                Err(e) => warn!(key = %own_key, error = %e, "heartbeat refresh failed"),
            }

            let (Some(set_key), Some(purger), Some(max)) =
                (&self.set_key, &self.purger, reap_after)
            else {
                continue;
            };
            counter += 1;
            if counter < max.max(1) {
                continue;
            }
            counter = 0;
            if let Err(e) = self.reap_pass(set_key, purger.as_ref()).await {
                warn!(set = %set_key, error = %e, "reap pass failed");
            }
        }
    }

    async fn reap_pass(&self, set_key: &str, purger: &dyn Purger) -> Result<(), CoordError> {
        // Re-assert own membership first so a previous reaper's false
        // positive on us heals itself.
        self.coord.set_add(set_key, &self.member).await?;
        debug!(set = %set_key, "checking for dead peers");
        for member in self.coord.set_members(set_key).await? {
            let key = format!("{}{}{}", self.prefix, member, self.postfix);
            if self.coord.exists(&key).await? {
                continue;
            }
            info!(set = %set_key, %member, "found dead peer");
            if self.coord.set_remove(set_key, &member).await? {
                purger
                    .purge_member(&self.coord, &self.prefix, &member, &self.postfix)
                    .await;
            }
        }
        Ok(())
    }
}

/// Handle to a spawned heartbeat.
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Ask the loop to exit at its next wakeup.
    pub fn signal_stop_intent(&self) {
        self.cancel.cancel();
    }

    /// Signal and wait for the loop to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "heartbeat task panicked");
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
