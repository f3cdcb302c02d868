// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File distribution end to end: a host serving real bytes over HTTP,
//! consumed through the registry-driven loader.

use crate::prelude::*;
use sd_core::{FileKind, TaskPayload};
use sd_files::{FileLoader, FsBackend};
use sd_node::{enqueue_with_files, FileProcessor, ProcessorError, ProcessorRegistry, StagedFile,
    Host, HostConfig, Worker, WorkerConfig, WithFiles};
use sd_core::DefaultPolicy;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

async fn serving_host(coord: &Arc<dyn sd_coord::Coordinator>) -> Arc<Host> {
    let host = Host::create(
        coord.clone(),
        Arc::new(FsBackend::new()),
        HostConfig::new("127.0.0.1", 0),
        None,
    )
    .await
    .unwrap();
    host.start().await.unwrap();
    host
}

#[tokio::test]
async fn download_streams_the_exact_bytes() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let payload_path = dir.path().join("a.bin");
    std::fs::write(&payload_path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    let host = serving_host(&coord).await;
    let file = host
        .bucket()
        .add("a.bin", payload_path.to_string_lossy(), FileKind::Readable)
        .await
        .unwrap();

    // Another process resolves the file through the registry alone.
    let loader = FileLoader::new(coord.clone());
    let mut out = Vec::new();
    loader.download(file.id, &mut out).await.unwrap();
    assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn upload_lands_in_the_hosts_backend() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();
    let target_path = dir.path().join("up.bin");

    let host = serving_host(&coord).await;
    let file = host
        .bucket()
        .add("up.bin", target_path.to_string_lossy(), FileKind::Writable)
        .await
        .unwrap();

    let local = dir.path().join("local-copy.bin");
    std::fs::write(&local, b"from far away").unwrap();
    let loader = FileLoader::new(coord.clone());
    loader.upload_from_path(file.id, &local).await.unwrap();

    assert_eq!(std::fs::read(&target_path).unwrap(), b"from far away");
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn download_of_an_unhosted_file_fails_cleanly() {
    let coord = coord();
    let loader = FileLoader::new(coord.clone());
    let mut out = Vec::new();
    assert!(loader
        .download(sd_core::FileId::new(1), &mut out)
        .await
        .is_err());
}

/// Copies every input into the matching output file, upper-casing.
struct Shout;

#[async_trait]
impl FileProcessor for Shout {
    async fn perform(
        &self,
        _args: &[Value],
        in_files: &[StagedFile],
        out_files: &[StagedFile],
        _kwargs: &Map<String, Value>,
    ) -> Result<(), ProcessorError> {
        for (input, output) in in_files.iter().zip(out_files) {
            let text = std::fs::read_to_string(&input.path).map_err(ProcessorError::unexpected)?;
            std::fs::write(&output.path, text.to_uppercase())
                .map_err(ProcessorError::unexpected)?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn file_processor_round_trips_inputs_to_outputs() {
    let coord = coord();
    let dir = tempfile::tempdir().unwrap();

    // Host side: one readable input, one writable output slot.
    let input_path = dir.path().join("in.txt");
    std::fs::write(&input_path, "quiet words").unwrap();
    let output_path = dir.path().join("out.txt");

    let host = serving_host(&coord).await;
    let input = host
        .bucket()
        .add("in.txt", input_path.to_string_lossy(), FileKind::Readable)
        .await
        .unwrap();
    let output = host
        .bucket()
        .add("out.txt", output_path.to_string_lossy(), FileKind::Writable)
        .await
        .unwrap();

    // Worker side: a file processor registered under its dotted name.
    let registry = ProcessorRegistry::new();
    registry.register("pipeline.Shout", Arc::new(|env: &sd_node::WorkerEnv| {
        Ok(Arc::new(WithFiles::new(Shout, env.clone())) as Arc<dyn sd_node::Processor>)
    }));
    let run_dir = tempfile::tempdir().unwrap();
    let worker = Worker::create(
        coord.clone(),
        Arc::new(registry),
        Arc::new(DefaultPolicy::default()),
        WorkerConfig::new(run_dir.path(), vec!["files".to_string()])
            .reserve_timeout(Duration::from_millis(50)),
        None,
    )
    .await
    .unwrap();

    let queue = sd_queue::Queue::open("files", coord.clone()).await.unwrap();
    let task = enqueue_with_files(
        &queue,
        "pipeline.Shout",
        TaskPayload::default(),
        vec![input.id],
        vec![output.id],
    )
    .await
    .unwrap();
    let id = task.id().unwrap();

    worker.start().await.unwrap();
    let finished = eventually(Duration::from_secs(10), || {
        let coord = coord.clone();
        async move {
            list(&coord, &sd_core::keys::queue_finished("files"))
                .await
                .contains(&id.to_string())
        }
    })
    .await;
    worker.shutdown().await.unwrap();
    assert!(finished, "file task never finished");

    assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "QUIET WORDS");
    // Run directories were cleaned up with the task.
    assert!(!run_dir.path().join(format!("task.{id}")).exists());

    host.shutdown().await.unwrap();
}
