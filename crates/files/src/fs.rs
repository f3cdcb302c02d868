// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-filesystem backend. File locations are absolute paths on the
//! serving host.

use crate::backend::{Backend, BackendRead, BackendWriter};
use crate::error::BackendError;
use async_trait::async_trait;
use bytes::Bytes;
use sd_core::FileRecord;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Serves and stores file payloads straight from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self {
        Self
    }

    fn path(file: &FileRecord) -> PathBuf {
        Path::new(&file.location).to_path_buf()
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn open_read(&self, file: &FileRecord) -> Result<BackendRead, BackendError> {
        let handle = File::open(Self::path(file)).await?;
        Ok(Box::pin(handle))
    }

    async fn open_write(
        &self,
        file: &FileRecord,
        _content_length: Option<u64>,
    ) -> Result<Box<dyn BackendWriter>, BackendError> {
        let path = Self::path(file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let handle = File::create(path).await?;
        Ok(Box::new(FsWriter { handle }))
    }

    async fn read_url(&self, _file: &FileRecord) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    async fn size(&self, file: &FileRecord) -> Result<u64, BackendError> {
        Ok(tokio::fs::metadata(Self::path(file)).await?.len())
    }

    async fn content_type(&self, file: &FileRecord) -> Result<String, BackendError> {
        Ok(mime_guess::from_path(&file.name).first_or_octet_stream().to_string())
    }

    async fn last_modified(&self, file: &FileRecord) -> Result<SystemTime, BackendError> {
        Ok(tokio::fs::metadata(Self::path(file)).await?.modified()?)
    }
}

struct FsWriter {
    handle: File,
}

#[async_trait]
impl BackendWriter for FsWriter {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError> {
        self.handle.write_all(&chunk).await?;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<(), BackendError> {
        self.handle.flush().await?;
        self.handle.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
