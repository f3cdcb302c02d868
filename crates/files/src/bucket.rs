// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-host file bucket.
//!
//! Locally: the set of files this host is willing to serve, persisted
//! as a JSON list of descriptors. In the coordinator: a `file:<id>`
//! hash per file plus this host's membership in `file:<id>:hosts`,
//! published under the per-file advisory lock. When the last host
//! leaves a file's hosts set, the file's registry entries are deleted.

use crate::error::BucketError;
use parking_lot::Mutex;
use sd_core::{keys, FileId, FileKind, FileRecord, HostId};
use sd_coord::{CoordLock, Coordinator};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Write locks guard whole uploads, whose duration is unbounded; the
/// TTL only exists so a crashed holder cannot deadlock peers forever.
const WRITE_LOCK_TTL: Duration = Duration::from_secs(3600);

/// A host's local collection of servable files.
pub struct FileBucket {
    coord: Arc<dyn Coordinator>,
    host: HostId,
    files: Mutex<HashMap<FileId, FileRecord>>,
    write_locks: Mutex<HashSet<FileId>>,
    registered: AtomicBool,
    store_path: Mutex<Option<PathBuf>>,
}

impl FileBucket {
    pub fn new(coord: Arc<dyn Coordinator>, host: HostId) -> Self {
        Self {
            coord,
            host,
            files: Mutex::new(HashMap::new()),
            write_locks: Mutex::new(HashSet::new()),
            registered: AtomicBool::new(false),
            store_path: Mutex::new(None),
        }
    }

    /// Persist to (and load from) this path.
    pub fn with_store_path(self, path: impl Into<PathBuf>) -> Self {
        *self.store_path.lock() = Some(path.into());
        self
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: FileId) -> Option<FileRecord> {
        self.files.lock().get(&id).cloned()
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.lock().keys().copied().collect()
    }

    pub fn is_write_locked(&self, id: FileId) -> bool {
        self.write_locks.lock().contains(&id)
    }

    /// Add a new file: allocate its id, store it locally, and publish
    /// it when the bucket is registered.
    pub async fn add(
        &self,
        name: impl Into<String>,
        location: impl Into<String>,
        kind: FileKind,
    ) -> Result<FileRecord, BucketError> {
        let id = FileId::new(self.coord.incr(keys::FILES_INDEX).await?);
        let record = FileRecord::new(id, name, location, kind);
        self.files.lock().insert(id, record.clone());
        if self.is_registered() {
            self.publish(&record).await?;
        }
        Ok(record)
    }

    /// Adopt an existing descriptor (rehydration path). Replaces any
    /// local file with the same id.
    pub async fn insert(&self, record: FileRecord) -> Result<(), BucketError> {
        self.files.lock().insert(record.id, record.clone());
        if self.is_registered() {
            self.publish(&record).await?;
        }
        Ok(())
    }

    /// Remove one file locally and withdraw it from the registry.
    pub async fn remove(&self, id: FileId) -> Result<Option<FileRecord>, BucketError> {
        let removed = self.files.lock().remove(&id);
        if removed.is_some() {
            self.release_write_lock(id).await?;
            if self.is_registered() {
                self.withdraw(id).await?;
            }
        }
        Ok(removed)
    }

    /// Publish every local file and mark the bucket registered.
    pub async fn register(&self) -> Result<(), BucketError> {
        let records: Vec<FileRecord> = self.files.lock().values().cloned().collect();
        for record in records {
            self.publish(&record).await?;
        }
        self.registered.store(true, Ordering::SeqCst);
        debug!(host_id = %self.host, "bucket registered");
        Ok(())
    }

    /// Withdraw every local file: release held write-locks, leave each
    /// `file:<id>:hosts` set, and delete registry entries that end up
    /// hostless.
    pub async fn unregister(&self) -> Result<(), BucketError> {
        let ids = self.file_ids();
        for id in ids {
            self.release_write_lock(id).await?;
            self.withdraw(id).await?;
        }
        self.registered.store(false, Ordering::SeqCst);
        debug!(host_id = %self.host, "bucket unregistered");
        Ok(())
    }

    async fn publish(&self, record: &FileRecord) -> Result<(), BucketError> {
        let guard = CoordLock::new(self.coord.clone(), keys::file_lock(record.id))
            .acquire()
            .await?;
        let result: Result<(), BucketError> = async {
            self.coord
                .hash_set_multiple(&keys::file(record.id), &record.registry_fields())
                .await?;
            self.coord
                .set_add(&keys::file_hosts(record.id), &self.host.to_string())
                .await?;
            Ok(())
        }
        .await;
        guard.release().await?;
        result
    }

    async fn withdraw(&self, id: FileId) -> Result<(), BucketError> {
        let guard = CoordLock::new(self.coord.clone(), keys::file_lock(id)).acquire().await?;
        let result: Result<(), BucketError> = async {
            self.coord
                .set_remove(&keys::file_hosts(id), &self.host.to_string())
                .await?;
            if self.coord.set_len(&keys::file_hosts(id)).await? < 1 {
                self.coord.delete(&keys::file(id)).await?;
                self.coord.delete(&keys::file_hosts(id)).await?;
            }
            Ok(())
        }
        .await;
        guard.release().await?;
        result
    }

    /// Take the write-lock on a file about to be uploaded to. Held for
    /// the entire upload. Idempotent for a lock this bucket already
    /// holds.
    pub async fn write_lock(&self, id: FileId) -> Result<(), BucketError> {
        if self.write_locks.lock().contains(&id) {
            return Ok(());
        }
        self.coord
            .set_with_ttl(&keys::file_writelock(id), &self.host.to_string(), WRITE_LOCK_TTL)
            .await?;
        self.write_locks.lock().insert(id);
        Ok(())
    }

    /// Release a held write-lock. A release without a prior acquire is
    /// a no-op.
    pub async fn release_write_lock(&self, id: FileId) -> Result<(), BucketError> {
        if !self.write_locks.lock().remove(&id) {
            return Ok(());
        }
        self.coord.delete(&keys::file_writelock(id)).await?;
        Ok(())
    }

    /// Rehydrate descriptors from the persistence path.
    pub async fn load(&self) -> Result<usize, BucketError> {
        let path = self.store_path.lock().clone().ok_or(BucketError::NoStorePath)?;
        if !path.exists() {
            return Ok(0);
        }
        let handle = std::fs::File::open(&path)?;
        self.load_from_reader(handle).await
    }

    /// Rehydrate descriptors from an open stream.
    pub async fn load_from_reader(&self, reader: impl Read) -> Result<usize, BucketError> {
        let records: Vec<FileRecord> = serde_json::from_reader(reader)?;
        let count = records.len();
        for record in records {
            self.insert(record).await?;
        }
        Ok(count)
    }

    /// Persist descriptors, rewriting atomically via a temp file.
    pub async fn store(&self) -> Result<(), BucketError> {
        let path = self.store_path.lock().clone().ok_or(BucketError::NoStorePath)?;
        let tmp = path.with_extension("tmp");
        {
            let mut handle = std::fs::File::create(&tmp)?;
            self.store_to_writer(&mut handle)?;
            handle.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Serialize descriptors into an open stream.
    pub fn store_to_writer(&self, writer: &mut impl Write) -> Result<(), BucketError> {
        let mut records: Vec<FileRecord> = self.files.lock().values().cloned().collect();
        records.sort_by_key(|record| record.id);
        serde_json::to_writer(writer, &records)?;
        Ok(())
    }
}

impl Drop for FileBucket {
    fn drop(&mut self) {
        if self.is_registered() {
            warn!(host_id = %self.host, "bucket dropped while registered");
        }
    }
}

#[cfg(test)]
#[path = "bucket_tests.rs"]
mod tests;
