// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::processor::{Processor, WorkerEnv};
use async_trait::async_trait;
use sd_core::WorkerId;
use sd_files::FileLoader;
use sd_queue::Task;
use sd_coord::MemoryCoordinator;

struct Noop;

#[async_trait]
impl Processor for Noop {
    async fn process(&self, _task: &mut Task) -> Result<(), ProcessorError> {
        Ok(())
    }
}

fn env() -> WorkerEnv {
    WorkerEnv {
        worker_id: WorkerId::new(1),
        run_root: std::env::temp_dir(),
        file_loader: FileLoader::new(Arc::new(MemoryCoordinator::new())),
    }
}

#[test]
fn registered_names_resolve() {
    let registry = ProcessorRegistry::new();
    registry.register_fn("demo.Noop", |_| Noop);
    let factory = registry.resolve("demo.Noop").unwrap();
    assert!(factory(&env()).is_ok());
}

#[test]
fn unknown_names_fail() {
    let registry = ProcessorRegistry::new();
    let err = match registry.resolve("does.not.Exist") {
        Err(err) => err,
        Ok(_) => panic!("expected resolve to fail for an unregistered name"),
    };
    assert!(err.to_string().contains("does.not.Exist"));
}

struct PrefixResolver;

impl ProcessorResolver for PrefixResolver {
    fn resolve(&self, name: &str) -> Option<ProcessorFactory> {
        name.starts_with("plugins.").then(|| {
            Arc::new(|_env: &WorkerEnv| Ok(Arc::new(Noop) as Arc<dyn Processor>))
                as ProcessorFactory
        })
    }
}

#[test]
fn resolvers_cover_names_missing_from_the_table() {
    let registry = ProcessorRegistry::new();
    registry.add_resolver(Arc::new(PrefixResolver));
    assert!(registry.resolve("plugins.Thumbnails").is_ok());
    assert!(registry.resolve("elsewhere.Thumbnails").is_err());
}

#[test]
fn resolver_hits_are_memoised() {
    let registry = ProcessorRegistry::new();
    registry.add_resolver(Arc::new(PrefixResolver));
    registry.resolve("plugins.Thumbnails").unwrap();
    // Second lookup is served from the table even without resolvers.
    *registry.resolvers.lock() = Vec::new();
    assert!(registry.resolve("plugins.Thumbnails").is_ok());
}
