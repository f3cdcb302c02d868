// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File descriptors as they appear in the registry and in bucket
//! persistence.

use crate::id::FileId;
use serde::{Deserialize, Serialize};

/// Access mode of a file, encoded as a one-letter tag on the wire.
///
/// A writable file cannot be served for reading; a locked file rejects
/// writes while its write-lock is held and rejects reads until the lock
/// is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// `r` — readable, servable over HTTP.
    #[serde(rename = "r")]
    Readable,
    /// `w` — writable, to be uploaded.
    #[serde(rename = "w")]
    Writable,
    /// `l` — locked, readable once the upload completes.
    #[serde(rename = "l")]
    Locked,
}

impl FileKind {
    /// The one-letter wire code stored in the `file:<id>` hash.
    pub fn code(&self) -> &'static str {
        match self {
            FileKind::Readable => "r",
            FileKind::Writable => "w",
            FileKind::Locked => "l",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(FileKind::Readable),
            "w" => Some(FileKind::Writable),
            "l" => Some(FileKind::Locked),
            _ => None,
        }
    }

    pub fn readable(&self) -> bool {
        matches!(self, FileKind::Readable | FileKind::Locked)
    }

    pub fn writable(&self) -> bool {
        matches!(self, FileKind::Writable)
    }
}

crate::simple_display! {
    FileKind {
        Readable => "r",
        Writable => "w",
        Locked => "l",
    }
}

/// A file known to the system.
///
/// `location` is backend-specific: an absolute path for the filesystem
/// backend, an object key for the object-store backend. Only `id`,
/// `name`, and `kind` are published to the coordinator; the location
/// stays local to the serving host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileRecord {
    pub fn new(id: FileId, name: impl Into<String>, location: impl Into<String>, kind: FileKind) -> Self {
        Self { id, name: name.into(), location: location.into(), kind }
    }

    /// Fields published to the `file:<id>` coordinator hash.
    pub fn registry_fields(&self) -> Vec<(String, String)> {
        vec![
            ("id".to_string(), self.id.to_string()),
            ("name".to_string(), self.name.clone()),
            ("type".to_string(), self.kind.code().to_string()),
        ]
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
