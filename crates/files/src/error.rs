// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-layer errors.

use sd_core::{FileId, IdParseError};
use sd_coord::CoordError;
use thiserror::Error;

/// Backend I/O failures. Surface as HTTP 500 on the serving side.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store: {0}")]
    Store(String),
}

impl BackendError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}

/// Bucket registration and persistence failures.
#[derive(Debug, Error)]
pub enum BucketError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("bucket persistence i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("bucket persistence encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bucket has no persistence path")]
    NoStorePath,
}

/// File resolution and transfer failures, surfaced to the caller of
/// download/upload. Not auto-converted to task failures.
#[derive(Debug, Error)]
pub enum FileLoaderError {
    #[error("FileNotFound, id = {0}")]
    FileNotFound(FileId),
    #[error("FileNotAvailable, id = {0}")]
    FileNotAvailable(FileId),
    #[error("HostNotAvailable, id = {0}")]
    HostNotAvailable(FileId),
    /// Programming error; fatal.
    #[error("LoaderNotSet")]
    LoaderNotSet,
    /// Programming error; fatal.
    #[error("PathNotSet")]
    PathNotSet,
    #[error("file server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("registry entry for {key} is missing field {field}")]
    MalformedRegistry { key: String, field: &'static str },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("transfer i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Id(#[from] IdParseError),
}
