// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming HTTP client for file payloads, plus the session pool
//! keyed by host address.

use crate::error::FileLoaderError;
use futures_util::StreamExt;
use parking_lot::Mutex;
use sd_core::FileId;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Client for one file server.
pub struct HttpClient {
    address: String,
    base_url: String,
    http: reqwest::Client,
}

/// `host:port` form of an address; a bare host gets port 80.
fn canonical_address(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:80")
    }
}

impl HttpClient {
    /// `address` is `host:port`; a bare host gets port 80.
    pub fn new(address: &str) -> Self {
        let address = canonical_address(address);
        let base_url = format!("http://{address}");
        Self { address, base_url, http: reqwest::Client::new() }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stream a file's bytes into `out`.
    pub async fn download(
        &self,
        id: FileId,
        out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), FileLoaderError> {
        let response = self.http.get(format!("{}/{id}", self.base_url)).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        debug!(file_id = %id, address = %self.address, "downloading");
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            out.write_all(&chunk?).await?;
        }
        out.flush().await?;
        Ok(())
    }

    /// Download into a file at `path`, creating it.
    pub async fn download_to_path(&self, id: FileId, path: &Path) -> Result<(), FileLoaderError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(path).await?;
        self.download(id, &mut out).await?;
        out.sync_all().await?;
        Ok(())
    }

    /// Stream a local file up as the file's new contents.
    pub async fn upload_from_path(&self, id: FileId, path: &Path) -> Result<(), FileLoaderError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        debug!(file_id = %id, address = %self.address, length, "uploading");
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .http
            .post(format!("{}/{id}", self.base_url))
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

async fn status_error(response: reqwest::Response) -> FileLoaderError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    FileLoaderError::Status { status, message }
}

/// Deduplicates HTTP sessions per server address.
#[derive(Default)]
pub struct ClientPool {
    clients: Mutex<HashMap<String, Arc<HttpClient>>>,
}

impl ClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client for `address`, created on first use.
    pub fn get(&self, address: &str) -> Arc<HttpClient> {
        let key = canonical_address(address);
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&key) {
            return client.clone();
        }
        let client = Arc::new(HttpClient::new(&key));
        clients.insert(key, client.clone());
        client
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
