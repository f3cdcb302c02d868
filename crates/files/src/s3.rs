// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store backend. File locations are object keys in one S3
//! bucket.
//!
//! Reads are served by redirect where possible: [`Backend::read_url`]
//! mints a presigned GET so payload bytes never pass through the host.
//! Uploads buffer into multipart parts once they outgrow the single
//! `put_object` threshold.

use crate::backend::{Backend, BackendRead, BackendWriter};
use crate::error::BackendError;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use sd_core::FileRecord;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Upload part size once an upload goes multipart.
const PART_SIZE: usize = 5 << 22;
/// Uploads larger than this (or of unknown size) use multipart.
const MULTIPART_THRESHOLD: u64 = 5 << 23;
/// Presigned read URLs stay valid this long.
const READ_URL_TTL: Duration = Duration::from_secs(300);

/// Credentials and bucket for the object store.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub key_id: String,
    pub access_key: String,
    pub region: String,
    pub bucket: String,
}

/// S3-compatible storage backend.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(config: &S3Config) -> Self {
        let credentials =
            Credentials::new(&config.key_id, &config.access_key, None, None, "stevedore");
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();
        Self { client: Client::from_conf(sdk_config), bucket: config.bucket.clone() }
    }

    /// Create the backing bucket when it does not exist yet.
    pub async fn ensure_bucket(&self) -> Result<(), BackendError> {
        let head = self.client.head_bucket().bucket(&self.bucket).send().await;
        if head.is_ok() {
            return Ok(());
        }
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(BackendError::store)?;
        Ok(())
    }
}

#[async_trait]
impl Backend for S3Backend {
    async fn open_read(&self, file: &FileRecord) -> Result<BackendRead, BackendError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&file.location)
            .send()
            .await
            .map_err(BackendError::store)?;
        Ok(Box::pin(object.body.into_async_read()))
    }

    async fn open_write(
        &self,
        file: &FileRecord,
        content_length: Option<u64>,
    ) -> Result<Box<dyn BackendWriter>, BackendError> {
        let use_multipart = content_length.map_or(true, |len| len > MULTIPART_THRESHOLD);
        Ok(Box::new(S3Writer {
            client: self.client.clone(),
            bucket: self.bucket.clone(),
            key: file.location.clone(),
            buffer: BytesMut::new(),
            use_multipart,
            upload_id: None,
            parts: Vec::new(),
        }))
    }

    async fn read_url(&self, file: &FileRecord) -> Result<Option<String>, BackendError> {
        let presigning =
            PresigningConfig::expires_in(READ_URL_TTL).map_err(BackendError::store)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&file.location)
            .presigned(presigning)
            .await
            .map_err(BackendError::store)?;
        Ok(Some(request.uri().to_string()))
    }

    async fn size(&self, file: &FileRecord) -> Result<u64, BackendError> {
        let head = self.head(file).await?;
        let length = head
            .content_length()
            .ok_or_else(|| BackendError::Store("head without content length".to_string()))?;
        Ok(length.max(0) as u64)
    }

    async fn content_type(&self, file: &FileRecord) -> Result<String, BackendError> {
        let head = self.head(file).await?;
        Ok(head
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string())
    }

    async fn last_modified(&self, file: &FileRecord) -> Result<SystemTime, BackendError> {
        let head = self.head(file).await?;
        let modified = head
            .last_modified()
            .ok_or_else(|| BackendError::Store("head without last modified".to_string()))?;
        let secs = modified.secs().max(0) as u64;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl S3Backend {
    async fn head(
        &self,
        file: &FileRecord,
    ) -> Result<aws_sdk_s3::operation::head_object::HeadObjectOutput, BackendError> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(&file.location)
            .send()
            .await
            .map_err(BackendError::store)
    }
}

struct S3Writer {
    client: Client,
    bucket: String,
    key: String,
    buffer: BytesMut,
    use_multipart: bool,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
}

impl S3Writer {
    async fn upload_id(&mut self) -> Result<String, BackendError> {
        if let Some(id) = &self.upload_id {
            return Ok(id.clone());
        }
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(BackendError::store)?;
        let id = created
            .upload_id()
            .ok_or_else(|| BackendError::Store("multipart upload without id".to_string()))?
            .to_string();
        self.upload_id = Some(id.clone());
        Ok(id)
    }

    async fn flush_part(&mut self) -> Result<(), BackendError> {
        let upload_id = self.upload_id().await?;
        let part_number = self.parts.len() as i32 + 1;
        let body = self.buffer.split().freeze();
        debug!(key = %self.key, part_number, bytes = body.len(), "uploading part");
        let uploaded = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(BackendError::store)?;
        self.parts.push(
            CompletedPart::builder()
                .set_e_tag(uploaded.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );
        Ok(())
    }
}

#[async_trait]
impl BackendWriter for S3Writer {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError> {
        self.buffer.extend_from_slice(&chunk);
        if self.use_multipart && self.buffer.len() >= PART_SIZE {
            self.flush_part().await?;
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<(), BackendError> {
        // Small uploads (and multipart uploads that never grew a part)
        // go up as one object.
        if self.upload_id.is_none() {
            let body = self.buffer.split().freeze();
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(BackendError::store)?;
            return Ok(());
        }

        if !self.buffer.is_empty() {
            self.flush_part().await?;
        }
        let upload_id = self.upload_id().await?;
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(self.parts.clone()))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(BackendError::store)?;
        Ok(())
    }
}
