// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host lifecycle.
//!
//! A host owns a bucket and the HTTP file server in front of it. Its
//! liveness key is the `host:<id>` hash itself, TTL-refreshed by the
//! heartbeat. A zombie host (TTL lapsed before refresh) restarts
//! itself — unregister plus re-register, preserving its id — with the
//! restart count bounded so a flapping coordinator cannot keep it
//! cycling forever.

use crate::error::NodeError;
use async_trait::async_trait;
use parking_lot::Mutex;
use sd_core::{keys, HostId};
use sd_coord::{Coordinator, Heartbeat, HeartbeatHandle, Purger};
use sd_files::{Backend, BucketError, FileBucket, FileServer, RunningServer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Host tuning knobs.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Advertised bind address.
    pub address: String,
    /// Bind port; 0 picks an ephemeral port and advertises it.
    pub port: u16,
    /// TTL on the `host:<id>` hash.
    pub ttl: Duration,
    /// Heartbeat refresh interval.
    pub interval: Duration,
    /// Zombie restarts tolerated before the host gives up.
    pub max_zombie_restarts: usize,
    /// Bucket persistence path (`bucket.json`), if any.
    pub bucket_path: Option<std::path::PathBuf>,
}

impl HostConfig {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ttl: Duration::from_secs(60),
            interval: Duration::from_secs(40),
            max_zombie_restarts: 3,
            bucket_path: None,
        }
    }

    pub fn timing(mut self, ttl: Duration, interval: Duration) -> Self {
        self.ttl = ttl;
        self.interval = interval;
        self
    }

    /// Persist the bucket at this path across restarts.
    pub fn bucket_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.bucket_path = Some(path.into());
        self
    }
}

struct RunningHost {
    server: RunningServer,
    heartbeat: HeartbeatHandle,
    zombie_tx: mpsc::Sender<()>,
}

/// One file-serving host process.
pub struct Host {
    id: HostId,
    coord: Arc<dyn Coordinator>,
    bucket: Arc<FileBucket>,
    backend: Arc<dyn Backend>,
    config: HostConfig,
    running: Mutex<Option<RunningHost>>,
    zombie_restarts: AtomicUsize,
    // Handed to the restart supervisor so it can drive this host
    // without keeping it alive on its own.
    weak: Weak<Host>,
}

impl Host {
    /// Allocate an id (or resume one) and build the host with its own
    /// bucket.
    pub async fn create(
        coord: Arc<dyn Coordinator>,
        backend: Arc<dyn Backend>,
        config: HostConfig,
        id: Option<HostId>,
    ) -> Result<Arc<Self>, NodeError> {
        let id = match id {
            Some(id) => id,
            None => HostId::new(coord.incr(keys::HOSTS_INDEX).await?),
        };
        let mut bucket = FileBucket::new(coord.clone(), id);
        if let Some(path) = &config.bucket_path {
            bucket = bucket.with_store_path(path);
        }
        Ok(Self::with_bucket(coord, Arc::new(bucket), backend, config, id))
    }

    /// Build around an existing bucket. The bucket must carry this
    /// host's id.
    pub fn with_bucket(
        coord: Arc<dyn Coordinator>,
        bucket: Arc<FileBucket>,
        backend: Arc<dyn Backend>,
        config: HostConfig,
        id: HostId,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id,
            coord,
            bucket,
            backend,
            config,
            running: Mutex::new(None),
            zombie_restarts: AtomicUsize::new(0),
            weak: weak.clone(),
        })
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn bucket(&self) -> &Arc<FileBucket> {
        &self.bucket
    }

    /// Address the running server is actually bound to.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|running| running.server.addr())
    }

    /// Run the server, register, start the heartbeat, rehydrate the
    /// bucket.
    pub async fn start(&self) -> Result<(), NodeError> {
        if self.running.lock().is_some() {
            return Err(NodeError::LifecycleState("host already running"));
        }
        let (zombie_tx, zombie_rx) = mpsc::channel(1);
        self.spin_up(zombie_tx).await?;
        self.spawn_restart_supervisor(zombie_rx);
        Ok(())
    }

    /// Unregister, stop the heartbeat and server, persist the bucket.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        let Some(running) = self.running.lock().take() else {
            return Err(NodeError::LifecycleState("host not running"));
        };
        self.tear_down(running).await
    }

    async fn spin_up(&self, zombie_tx: mpsc::Sender<()>) -> Result<(), NodeError> {
        let bind: SocketAddr = format!("{}:{}", self.config.address, self.config.port)
            .parse()
            .map_err(|_| {
                NodeError::Config(format!(
                    "unparseable bind address {}:{}",
                    self.config.address, self.config.port
                ))
            })?;
        let server = FileServer::new(bind, self.bucket.clone(), self.backend.clone())
            .start()
            .await?;
        let advertised_port = server.addr().port();

        self.coord
            .hash_set_multiple(
                &keys::host(self.id),
                &[
                    ("id".to_string(), self.id.to_string()),
                    ("address".to_string(), self.config.address.clone()),
                    ("port".to_string(), advertised_port.to_string()),
                ],
            )
            .await?;
        self.coord.expire(&keys::host(self.id), self.config.ttl).await?;
        self.coord.set_add(keys::HOSTS_SET, &self.id.to_string()).await?;
        self.bucket.register().await?;

        let purger = Arc::new(HostPurger { zombie_tx: zombie_tx.clone() });
        let heartbeat = Heartbeat::new(
            self.coord.clone(),
            self.id.to_string(),
            self.config.ttl,
            self.config.interval,
        )
        .prefix(keys::HOST_PREFIX)
        .reap(keys::HOSTS_SET, purger)
        .spawn();

        match self.bucket.load().await {
            Ok(count) => {
                if count > 0 {
                    info!(host_id = %self.id, files = count, "bucket rehydrated");
                }
            }
            Err(BucketError::NoStorePath) => {}
            Err(e) => return Err(e.into()),
        }

        *self.running.lock() = Some(RunningHost { server, heartbeat, zombie_tx });
        info!(host_id = %self.id, port = advertised_port, "host started");
        Ok(())
    }

    async fn tear_down(&self, running: RunningHost) -> Result<(), NodeError> {
        self.bucket.unregister().await?;
        self.coord
            .set_remove(keys::HOSTS_SET, &self.id.to_string())
            .await?;
        self.coord.delete(&keys::host(self.id)).await?;
        running.heartbeat.stop().await;
        running.server.shutdown().await;
        match self.bucket.store().await {
            Ok(()) | Err(BucketError::NoStorePath) => {}
            Err(e) => warn!(host_id = %self.id, error = %e, "bucket store failed"),
        }
        info!(host_id = %self.id, "host stopped");
        Ok(())
    }

    fn spawn_restart_supervisor(&self, mut zombie_rx: mpsc::Receiver<()>) {
        let Some(host) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            while zombie_rx.recv().await.is_some() {
                let attempt = host.zombie_restarts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt > host.config.max_zombie_restarts {
                    error!(
                        host_id = %host.id,
                        attempts = attempt - 1,
                        "zombie restart limit reached, shutting down"
                    );
                    if let Err(e) = host.shutdown().await {
                        warn!(host_id = %host.id, error = %e, "give-up shutdown failed");
                    }
                    return;
                }
                warn!(host_id = %host.id, attempt, "zombie detected, restarting");
                if let Err(e) = host.restart().await {
                    error!(host_id = %host.id, error = %e, "zombie restart failed");
                    return;
                }
            }
        });
    }

    /// Shutdown then start again, preserving the id and the zombie
    /// channel.
    async fn restart(&self) -> Result<(), NodeError> {
        let Some(running) = self.running.lock().take() else {
            return Err(NodeError::LifecycleState("host not running"));
        };
        let zombie_tx = running.zombie_tx.clone();
        self.tear_down(running).await?;
        self.spin_up(zombie_tx).await
    }
}

/// Reaper reactions for the hosts set.
struct HostPurger {
    zombie_tx: mpsc::Sender<()>,
}

#[async_trait]
impl Purger for HostPurger {
    async fn purge_member(
        &self,
        coord: &Arc<dyn Coordinator>,
        prefix: &str,
        member: &str,
        postfix: &str,
    ) {
        // The liveness hash expired with the peer; drop any leftover
        // key for hygiene. Files the dead host served stay registered
        // until their other hosts unregister them.
        let key = format!("{prefix}{member}{postfix}");
        if let Err(e) = coord.delete(&key).await {
            warn!(%member, error = %e, "dead host cleanup failed");
        }
        info!(%member, "purged dead host");
    }

    async fn zombie(&self) {
        // Heartbeat context; the restart runs on the supervisor.
        let _ = self.zombie_tx.try_send(());
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
