// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File resolution: registry hash → serving host → pooled client.

use crate::client::ClientPool;
use crate::error::FileLoaderError;
use sd_core::{keys, FileId, FileKind, HostId};
use sd_coord::Coordinator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Resolves file ids against the registry and moves payloads over
/// HTTP.
#[derive(Clone)]
pub struct FileLoader {
    coord: Arc<dyn Coordinator>,
    pool: Arc<ClientPool>,
}

impl FileLoader {
    pub fn new(coord: Arc<dyn Coordinator>) -> Self {
        Self { coord, pool: Arc::new(ClientPool::new()) }
    }

    /// Share a client pool with other loaders.
    pub fn with_pool(mut self, pool: Arc<ClientPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Read a file's registry entry.
    pub async fn get_file(&self, id: FileId) -> Result<RemoteFile, FileLoaderError> {
        let key = keys::file(id);
        let hash = self.coord.hash_get_all(&key).await?;
        if hash.is_empty() {
            return Err(FileLoaderError::FileNotFound(id));
        }
        let name = hash
            .get("name")
            .ok_or(FileLoaderError::MalformedRegistry { key: key.clone(), field: "name" })?
            .clone();
        let kind = hash
            .get("type")
            .and_then(|code| FileKind::from_code(code))
            .ok_or(FileLoaderError::MalformedRegistry { key, field: "type" })?;
        Ok(RemoteFile { id, name, kind, path: None, loader: Some(self.clone()) })
    }

    /// Pick a serving host for the file and return its `host:port`.
    ///
    /// Host choice is a random member of `file:<id>:hosts`, so load
    /// spreads without bookkeeping.
    pub async fn server_address(&self, id: FileId) -> Result<String, FileLoaderError> {
        let member = self
            .coord
            .set_random_member(&keys::file_hosts(id))
            .await?
            .ok_or(FileLoaderError::FileNotAvailable(id))?;
        let host_id: HostId = member.parse()?;
        let key = keys::host(host_id);
        let hash = self.coord.hash_get_all(&key).await?;
        if hash.is_empty() {
            // The host died between the set read and the hash read.
            return Err(FileLoaderError::HostNotAvailable(id));
        }
        let address = hash
            .get("address")
            .ok_or(FileLoaderError::MalformedRegistry { key: key.clone(), field: "address" })?;
        let port = hash
            .get("port")
            .ok_or(FileLoaderError::MalformedRegistry { key, field: "port" })?;
        Ok(format!("{address}:{port}"))
    }

    /// Stream a file's bytes into `out`.
    pub async fn download(
        &self,
        id: FileId,
        out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<RemoteFile, FileLoaderError> {
        let file = self.get_file(id).await?;
        let client = self.pool.get(&self.server_address(id).await?);
        client.download(id, out).await?;
        Ok(file)
    }

    /// Download a file to a local path.
    pub async fn download_to_path(
        &self,
        id: FileId,
        path: &Path,
    ) -> Result<RemoteFile, FileLoaderError> {
        let mut file = self.get_file(id).await?;
        let client = self.pool.get(&self.server_address(id).await?);
        client.download_to_path(id, path).await?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Upload a local path as the file's contents.
    pub async fn upload_from_path(
        &self,
        id: FileId,
        path: &Path,
    ) -> Result<RemoteFile, FileLoaderError> {
        let mut file = self.get_file(id).await?;
        let client = self.pool.get(&self.server_address(id).await?);
        client.upload_from_path(id, path).await?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }
}

/// A file as seen from the consuming side: registry descriptor plus an
/// optional local path once downloaded (or staged for upload).
#[derive(Clone)]
pub struct RemoteFile {
    pub id: FileId,
    pub name: String,
    pub kind: FileKind,
    pub path: Option<PathBuf>,
    loader: Option<FileLoader>,
}

impl RemoteFile {
    fn loader(&self) -> Result<&FileLoader, FileLoaderError> {
        self.loader.as_ref().ok_or(FileLoaderError::LoaderNotSet)
    }

    /// Download to `path` and remember it as the local copy.
    pub async fn download_to(&mut self, path: impl Into<PathBuf>) -> Result<(), FileLoaderError> {
        let path = path.into();
        self.loader()?.clone().download_to_path(self.id, &path).await?;
        self.path = Some(path);
        Ok(())
    }

    /// Upload the local copy back to a serving host.
    pub async fn upload(&self) -> Result<(), FileLoaderError> {
        let path = self.path.clone().ok_or(FileLoaderError::PathNotSet)?;
        self.loader()?.clone().upload_from_path(self.id, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
