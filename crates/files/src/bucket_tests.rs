// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sd_coord::MemoryCoordinator;

fn coord() -> Arc<dyn Coordinator> {
    Arc::new(MemoryCoordinator::new())
}

#[tokio::test]
async fn add_allocates_ids_from_the_counter() {
    let bucket = FileBucket::new(coord(), HostId::new(1));
    let first = bucket.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    let second = bucket.add("b.bin", "/srv/b.bin", FileKind::Readable).await.unwrap();
    assert_eq!(first.id, FileId::new(1));
    assert_eq!(second.id, FileId::new(2));
    assert_eq!(bucket.get(first.id).unwrap().name, "a.bin");
}

#[tokio::test]
async fn unregistered_bucket_publishes_nothing() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(1));
    let file = bucket.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    assert!(coord.hash_get_all(&keys::file(file.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn register_publishes_hash_and_host_membership() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(3));
    let file = bucket.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    bucket.register().await.unwrap();

    let hash = coord.hash_get_all(&keys::file(file.id)).await.unwrap();
    assert_eq!(hash.get("name").map(String::as_str), Some("a.bin"));
    assert_eq!(hash.get("type").map(String::as_str), Some("r"));
    assert!(coord
        .set_members(&keys::file_hosts(file.id))
        .await
        .unwrap()
        .contains(&"3".to_string()));
    // The advisory lock was released.
    assert!(!coord.exists(&keys::file_lock(file.id)).await.unwrap());
}

#[tokio::test]
async fn adds_after_registration_publish_immediately() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(3));
    bucket.register().await.unwrap();
    let file = bucket.add("late.bin", "/srv/late.bin", FileKind::Readable).await.unwrap();
    assert!(!coord.hash_get_all(&keys::file(file.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn last_host_leaving_deletes_the_registry_entry() {
    let coord = coord();
    let first = FileBucket::new(coord.clone(), HostId::new(1));
    let file = first.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    first.register().await.unwrap();

    // A second host serves the same file id.
    let second = FileBucket::new(coord.clone(), HostId::new(2));
    second.insert(file.clone()).await.unwrap();
    second.register().await.unwrap();

    first.unregister().await.unwrap();
    // Still one host left: entry survives.
    assert!(!coord.hash_get_all(&keys::file(file.id)).await.unwrap().is_empty());

    second.unregister().await.unwrap();
    // Hosts set empty: hash and set are gone.
    assert!(!coord.exists(&keys::file(file.id)).await.unwrap());
    assert!(!coord.exists(&keys::file_hosts(file.id)).await.unwrap());
}

#[tokio::test]
async fn remove_withdraws_a_single_file() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(1));
    let keep = bucket.add("keep.bin", "/srv/keep.bin", FileKind::Readable).await.unwrap();
    let victim = bucket.add("drop.bin", "/srv/drop.bin", FileKind::Readable).await.unwrap();
    bucket.register().await.unwrap();

    let removed = bucket.remove(victim.id).await.unwrap();
    assert_eq!(removed.map(|r| r.name), Some("drop.bin".to_string()));
    assert!(bucket.get(victim.id).is_none());
    assert!(!coord.exists(&keys::file(victim.id)).await.unwrap());
    // The other file is untouched.
    assert!(!coord.hash_get_all(&keys::file(keep.id)).await.unwrap().is_empty());

    // Removing an unknown id reports nothing.
    assert!(bucket.remove(FileId::new(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn write_lock_is_idempotent_and_release_is_a_noop_without_acquire() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(1));
    let file = bucket.add("up.bin", "/srv/up.bin", FileKind::Writable).await.unwrap();

    bucket.write_lock(file.id).await.unwrap();
    bucket.write_lock(file.id).await.unwrap();
    assert!(bucket.is_write_locked(file.id));
    assert!(coord.exists(&keys::file_writelock(file.id)).await.unwrap());

    bucket.release_write_lock(file.id).await.unwrap();
    assert!(!coord.exists(&keys::file_writelock(file.id)).await.unwrap());
    // Releasing again is harmless.
    bucket.release_write_lock(file.id).await.unwrap();
}

#[tokio::test]
async fn unregister_releases_held_write_locks() {
    let coord = coord();
    let bucket = FileBucket::new(coord.clone(), HostId::new(1));
    let file = bucket.add("up.bin", "/srv/up.bin", FileKind::Writable).await.unwrap();
    bucket.register().await.unwrap();
    bucket.write_lock(file.id).await.unwrap();

    bucket.unregister().await.unwrap();
    assert!(!coord.exists(&keys::file_writelock(file.id)).await.unwrap());
}

#[tokio::test]
async fn persistence_round_trips_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bucket.json");
    let coord = coord();

    let bucket = FileBucket::new(coord.clone(), HostId::new(1)).with_store_path(&path);
    bucket.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    bucket.add("b.bin", "/srv/b.bin", FileKind::Locked).await.unwrap();
    bucket.store().await.unwrap();

    let rehydrated = FileBucket::new(coord, HostId::new(1)).with_store_path(&path);
    assert_eq!(rehydrated.load().await.unwrap(), 2);
    assert_eq!(rehydrated.get(FileId::new(1)).unwrap().name, "a.bin");
    assert_eq!(rehydrated.get(FileId::new(2)).unwrap().kind, FileKind::Locked);
}

#[tokio::test]
async fn load_on_a_registered_bucket_publishes_loaded_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bucket.json");
    let coord = coord();

    let seeder = FileBucket::new(coord.clone(), HostId::new(1)).with_store_path(&path);
    let file = seeder.add("a.bin", "/srv/a.bin", FileKind::Readable).await.unwrap();
    seeder.store().await.unwrap();

    let bucket = FileBucket::new(coord.clone(), HostId::new(2)).with_store_path(&path);
    bucket.register().await.unwrap();
    bucket.load().await.unwrap();
    assert!(coord
        .set_members(&keys::file_hosts(file.id))
        .await
        .unwrap()
        .contains(&"2".to_string()));
}

#[tokio::test]
async fn load_without_a_path_fails() {
    let bucket = FileBucket::new(coord(), HostId::new(1));
    assert!(matches!(bucket.load().await, Err(BucketError::NoStorePath)));
}
