// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage backend interface consumed by the bucket and the file
//! server.
//!
//! A backend maps a file's `location` to bytes: an absolute path for
//! the filesystem backend, an object key for the object store. Reads
//! are plain async streams; writes are chunked so the object-store
//! backend can buffer into multipart uploads.

use crate::error::BackendError;
use async_trait::async_trait;
use bytes::Bytes;
use sd_core::FileRecord;
use std::pin::Pin;
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Readable byte stream for one file.
pub type BackendRead = Pin<Box<dyn AsyncRead + Send>>;

/// Sink for one upload. Must be finished explicitly; dropping an
/// unfinished writer abandons the upload.
#[async_trait]
pub trait BackendWriter: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError>;
    async fn finish(self: Box<Self>) -> Result<(), BackendError>;
}

/// One storage backend per bucket.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn open_read(&self, file: &FileRecord) -> Result<BackendRead, BackendError>;

    async fn open_write(
        &self,
        file: &FileRecord,
        content_length: Option<u64>,
    ) -> Result<Box<dyn BackendWriter>, BackendError>;

    /// A presigned read URL, when the backend can mint one. The file
    /// server turns it into a 302 instead of proxying the bytes.
    async fn read_url(&self, file: &FileRecord) -> Result<Option<String>, BackendError>;

    async fn size(&self, file: &FileRecord) -> Result<u64, BackendError>;

    async fn content_type(&self, file: &FileRecord) -> Result<String, BackendError>;

    async fn last_modified(&self, file: &FileRecord) -> Result<SystemTime, BackendError>;
}
