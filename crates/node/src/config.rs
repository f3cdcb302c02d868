// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration.
//!
//! The JSON shape is shared by hosts and workers:
//! `{address, port, runDir, dbhost, dbport, dbdb, dbpassword, queues,
//! backend}` where `backend.backend` selects `filesystem` or `s3`.

use crate::error::NodeError;
use sd_coord::RedisConfig;
use sd_files::{Backend, FsBackend, S3Backend, S3Config};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_dbhost() -> String {
    "localhost".to_string()
}

fn default_dbport() -> u16 {
    6379
}

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Filesystem,
    S3 {
        #[serde(rename = "keyId")]
        key_id: String,
        #[serde(rename = "accessKey")]
        access_key: String,
        region: String,
        #[serde(rename = "bucketName")]
        bucket_name: String,
    },
}

impl BackendConfig {
    pub fn build(&self) -> Arc<dyn Backend> {
        match self {
            BackendConfig::Filesystem => Arc::new(FsBackend::new()),
            BackendConfig::S3 { key_id, access_key, region, bucket_name } => {
                Arc::new(S3Backend::new(&S3Config {
                    key_id: key_id.clone(),
                    access_key: access_key.clone(),
                    region: region.clone(),
                    bucket: bucket_name.clone(),
                }))
            }
        }
    }
}

/// Recognized node options.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub address: String,
    pub port: u16,
    #[serde(rename = "runDir")]
    pub run_dir: PathBuf,
    #[serde(default = "default_dbhost")]
    pub dbhost: String,
    #[serde(default = "default_dbport")]
    pub dbport: u16,
    #[serde(default)]
    pub dbdb: i64,
    #[serde(default)]
    pub dbpassword: Option<String>,
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn redis(&self) -> RedisConfig {
        RedisConfig {
            host: self.dbhost.clone(),
            port: self.dbport,
            db: self.dbdb,
            password: self.dbpassword.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
