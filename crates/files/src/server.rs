// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The embedded HTTP file server.
//!
//! One server per host, bound to the host's advertised address. The
//! surface is exactly `GET`/`HEAD`/`POST /<fileId>`:
//!
//! - GET/HEAD: 404 unknown id, 403 not readable (or write-locked),
//!   302 when the backend mints a presigned URL, otherwise 200 with
//!   Content-Type, Content-Length, and Last-Modified.
//! - POST: 404/403 symmetrically, then the request body streams into
//!   the backend writer under the file's write-lock.
//!
//! Backend failures become 500s; the body never lies about status.

use crate::backend::Backend;
use crate::bucket::FileBucket;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use sd_core::{FileId, FileRecord};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Clone)]
struct ServerState {
    bucket: Arc<FileBucket>,
    backend: Arc<dyn Backend>,
}

/// The file server, ready to bind.
pub struct FileServer {
    addr: SocketAddr,
    bucket: Arc<FileBucket>,
    backend: Arc<dyn Backend>,
}

impl FileServer {
    pub fn new(addr: SocketAddr, bucket: Arc<FileBucket>, backend: Arc<dyn Backend>) -> Self {
        Self { addr, bucket, backend }
    }

    /// Bind and start serving. Binding to port 0 picks an ephemeral
    /// port; the bound address is on the returned handle.
    pub async fn start(self) -> Result<RunningServer, std::io::Error> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let state = ServerState { bucket: self.bucket, backend: self.backend };
        let router = Router::new()
            .route("/:id", get(serve_get).post(serve_post))
            .with_state(state);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        info!(addr = %local_addr, "file server starting");
        let task = tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "file server terminated");
            }
        });
        Ok(RunningServer { addr: local_addr, cancel, task })
    }
}

/// A bound, serving file server.
pub struct RunningServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(self) {
        info!(addr = %self.addr, "file server shutting down");
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "file server task panicked");
        }
    }
}

/// Resolve the path segment to a servable file, or the error response
/// for this request.
fn resolve(state: &ServerState, raw: &str, for_write: bool) -> Result<FileRecord, Response> {
    let Ok(id) = raw.parse::<FileId>() else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };
    let Some(file) = state.bucket.get(id) else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };
    if for_write {
        if !file.kind.writable() {
            return Err((StatusCode::FORBIDDEN, "file not writable").into_response());
        }
    } else {
        if !file.kind.readable() {
            return Err((StatusCode::FORBIDDEN, "file not readable").into_response());
        }
        // A locked file stays unreadable while its upload is running.
        if state.bucket.is_write_locked(id) {
            return Err((StatusCode::FORBIDDEN, "file is write-locked").into_response());
        }
    }
    Ok(file)
}

fn http_date(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

async fn serve_get(State(state): State<ServerState>, Path(raw): Path<String>) -> Response {
    let file = match resolve(&state, &raw, false) {
        Ok(file) => file,
        Err(response) => return response,
    };

    match state.backend.read_url(&file).await {
        Ok(Some(url)) => {
            return (StatusCode::FOUND, [(header::LOCATION, url)]).into_response();
        }
        Ok(None) => {}
        Err(e) => {
            error!(file_id = %file.id, error = %e, "read url failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
        }
    }

    let headers = match file_headers(&state, &file).await {
        Ok(headers) => headers,
        Err(response) => return response,
    };
    match state.backend.open_read(&file).await {
        Ok(read) => {
            info!(file_id = %file.id, name = %file.name, "serving file");
            let body = Body::from_stream(ReaderStream::new(read));
            (StatusCode::OK, headers, body).into_response()
        }
        Err(e) => {
            error!(file_id = %file.id, error = %e, "open for read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response()
        }
    }
}

async fn file_headers(state: &ServerState, file: &FileRecord) -> Result<HeaderMap, Response> {
    let fail = |e: crate::error::BackendError| {
        error!(file_id = %file.id, error = %e, "stat failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response()
    };
    let size = state.backend.size(file).await.map_err(fail)?;
    let content_type = state.backend.content_type(file).await.map_err(fail)?;
    let modified = state.backend.last_modified(file).await.map_err(fail)?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = size.to_string().parse() {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    if let Ok(value) = http_date(modified).parse() {
        headers.insert(header::LAST_MODIFIED, value);
    }
    Ok(headers)
}

async fn serve_post(
    State(state): State<ServerState>,
    Path(raw): Path<String>,
    request: Request,
) -> Response {
    let file = match resolve(&state, &raw, true) {
        Ok(file) => file,
        Err(response) => return response,
    };

    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    // The write-lock spans the whole upload.
    if let Err(e) = state.bucket.write_lock(file.id).await {
        error!(file_id = %file.id, error = %e, "write lock failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
    }
    info!(file_id = %file.id, name = %file.name, ?content_length, "starting upload");
    let response = stream_upload(&state, &file, content_length, request).await;
    if let Err(e) = state.bucket.release_write_lock(file.id).await {
        warn!(file_id = %file.id, error = %e, "write lock release failed");
    }
    response
}

async fn stream_upload(
    state: &ServerState,
    file: &FileRecord,
    content_length: Option<u64>,
    request: Request,
) -> Response {
    let mut writer = match state.backend.open_write(file, content_length).await {
        Ok(writer) => writer,
        Err(e) => {
            error!(file_id = %file.id, error = %e, "open for write failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
        }
    };

    let mut stream = request.into_body().into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(file_id = %file.id, error = %e, "upload body aborted");
                return (StatusCode::INTERNAL_SERVER_ERROR, "upload aborted").into_response();
            }
        };
        if let Err(e) = writer.write_chunk(chunk).await {
            error!(file_id = %file.id, error = %e, "write failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
        }
    }
    if let Err(e) = writer.finish().await {
        error!(file_id = %file.id, error = %e, "finalize failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
    }
    info!(file_id = %file.id, "finished upload");
    StatusCode::OK.into_response()
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
