// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sd_core::{FileId, FileKind};
use tokio::io::AsyncReadExt;

fn record(dir: &tempfile::TempDir, name: &str, kind: FileKind) -> FileRecord {
    let location = dir.path().join(name).to_string_lossy().into_owned();
    FileRecord::new(FileId::new(1), name, location, kind)
}

#[tokio::test]
async fn write_then_read_round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let file = record(&dir, "payload.bin", FileKind::Writable);
    let backend = FsBackend::new();

    let mut writer = backend.open_write(&file, Some(8)).await.unwrap();
    writer.write_chunk(Bytes::from_static(b"dead")).await.unwrap();
    writer.write_chunk(Bytes::from_static(b"beef")).await.unwrap();
    writer.finish().await.unwrap();

    let mut read = backend.open_read(&file).await.unwrap();
    let mut contents = Vec::new();
    read.read_to_end(&mut contents).await.unwrap();
    assert_eq!(contents, b"deadbeef");
    assert_eq!(backend.size(&file).await.unwrap(), 8);
}

#[tokio::test]
async fn content_type_follows_the_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsBackend::new();
    let json = record(&dir, "data.json", FileKind::Readable);
    assert_eq!(backend.content_type(&json).await.unwrap(), "application/json");
    let blob = record(&dir, "blob.xyz123", FileKind::Readable);
    assert_eq!(
        backend.content_type(&blob).await.unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn reads_of_missing_files_fail_with_io() {
    let dir = tempfile::tempdir().unwrap();
    let file = record(&dir, "nope.bin", FileKind::Readable);
    let backend = FsBackend::new();
    assert!(matches!(
        backend.open_read(&file).await,
        Err(BackendError::Io(_))
    ));
}

#[tokio::test]
async fn no_presigned_urls_from_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let file = record(&dir, "a.bin", FileKind::Readable);
    assert_eq!(FsBackend::new().read_url(&file).await.unwrap(), None);
}
