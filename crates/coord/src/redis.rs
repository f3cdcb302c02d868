// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed coordinator.

use crate::coordinator::{ttl_secs, Coordinator};
use crate::error::CoordError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

/// Connection parameters for the shared store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 6379, db: 0, password: None }
    }
}

impl RedisConfig {
    fn url(&self) -> String {
        match &self.password {
            Some(password) => {
                format!("redis://:{}@{}:{}/{}", password, self.host, self.port, self.db)
            }
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// [`Coordinator`] over a managed Redis connection.
///
/// The connection manager reconnects on its own; individual commands
/// surface transient failures as [`CoordError::Redis`] and callers
/// retry per their own contracts.
#[derive(Clone)]
pub struct RedisCoordinator {
    manager: ConnectionManager,
}

impl RedisCoordinator {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CoordError> {
        let client = redis::Client::open(config.url().as_str())?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl Coordinator for RedisCoordinator {
    async fn incr(&self, key: &str) -> Result<u64, CoordError> {
        Ok(self.conn().incr(key, 1u64).await?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CoordError> {
        let _: () = self.conn().hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_set_multiple(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), CoordError> {
        let _: () = self.conn().hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordError> {
        Ok(self.conn().hgetall(key).await?)
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<(), CoordError> {
        let _: () = self.conn().lpush(key, value).await?;
        Ok(())
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<(), CoordError> {
        let _: () = self.conn().rpush(key, value).await?;
        Ok(())
    }

    async fn pop_push(&self, source: &str, dest: &str) -> Result<Option<String>, CoordError> {
        Ok(self.conn().rpoplpush(source, dest).await?)
    }

    async fn pop_push_blocking(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CoordError> {
        let secs = ttl_secs(timeout) as f64;
        Ok(self.conn().brpoplpush(source, dest, secs).await?)
    }

    async fn list_remove(
        &self,
        key: &str,
        occurrences: isize,
        value: &str,
    ) -> Result<usize, CoordError> {
        Ok(self.conn().lrem(key, occurrences, value).await?)
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CoordError> {
        Ok(self.conn().lrange(key, start, stop).await?)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CoordError> {
        Ok(self.conn().sadd(key, member).await?)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CoordError> {
        Ok(self.conn().srem(key, member).await?)
    }

    async fn set_len(&self, key: &str) -> Result<usize, CoordError> {
        Ok(self.conn().scard(key).await?)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordError> {
        Ok(self.conn().smembers(key).await?)
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, CoordError> {
        Ok(self.conn().srandmember(key).await?)
    }

    async fn exists(&self, key: &str) -> Result<bool, CoordError> {
        Ok(self.conn().exists(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), CoordError> {
        let _: () = self.conn().del(key).await?;
        Ok(())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CoordError> {
        let _: () = self.conn().set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CoordError> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut self.conn())
            .await?;
        Ok(reply.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CoordError> {
        Ok(self.conn().expire(key, ttl_secs(ttl) as i64).await?)
    }
}
