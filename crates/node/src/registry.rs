// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor name resolution.
//!
//! Names are dotted strings carried in the task hash. Resolution
//! checks the preregistered table first, then asks each pluggable
//! resolver in order; resolver hits are memoised back into the table.

use crate::processor::{Processor, ProcessorError, WorkerEnv};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Builds a processor instance for a worker.
pub type ProcessorFactory =
    Arc<dyn Fn(&WorkerEnv) -> Result<Arc<dyn Processor>, ProcessorError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no processor named {0:?} available")]
    UnknownProcessor(String),
}

/// Fallback lookup for names missing from the registry table, e.g. a
/// plugin directory.
pub trait ProcessorResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<ProcessorFactory>;
}

/// Name → factory table with pluggable fallback resolvers.
#[derive(Default)]
pub struct ProcessorRegistry {
    named: Mutex<HashMap<String, ProcessorFactory>>,
    resolvers: Mutex<Vec<Arc<dyn ProcessorResolver>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its full dotted name.
    pub fn register(&self, name: impl Into<String>, factory: ProcessorFactory) {
        self.named.lock().insert(name.into(), factory);
    }

    /// Convenience for infallible constructors.
    pub fn register_fn<F, P>(&self, name: impl Into<String>, construct: F)
    where
        F: Fn(&WorkerEnv) -> P + Send + Sync + 'static,
        P: Processor + 'static,
    {
        self.register(
            name,
            Arc::new(move |env| Ok(Arc::new(construct(env)) as Arc<dyn Processor>)),
        );
    }

    pub fn add_resolver(&self, resolver: Arc<dyn ProcessorResolver>) {
        self.resolvers.lock().push(resolver);
    }

    /// Resolve a name to a factory.
    pub fn resolve(&self, name: &str) -> Result<ProcessorFactory, RegistryError> {
        if let Some(factory) = self.named.lock().get(name) {
            return Ok(factory.clone());
        }
        let resolvers: Vec<Arc<dyn ProcessorResolver>> = self.resolvers.lock().clone();
        for resolver in resolvers {
            if let Some(factory) = resolver.resolve(name) {
                self.named.lock().insert(name.to_string(), factory.clone());
                return Ok(factory);
            }
        }
        Err(RegistryError::UnknownProcessor(name.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
