// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Redis cache. Values are stored as JSON strings; the multiplexed connection
//! is opened on first use so startup does not depend on Redis being up.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::domain::stores::{AdapterError, CacheStore};

impl From<redis::RedisError> for AdapterError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(err.to_string())
        } else {
            AdapterError::ConnectionFailure(err.to_string())
        }
    }
}

pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisCache {
    /// Validates the URL only
    pub fn new(url: &str) -> Result<Self, AdapterError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, AdapterError> {
        let conn = self
            .connection
            .get_or_try_init(|| self.client.get_multiplexed_tokio_connection())
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|s| serde_json::from_str(&s).map_err(AdapterError::from))
            .transpose()
    }

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), AdapterError> {
        let mut conn = self.connection().await?;
        let body = serde_json::to_string(value)?;
        if ttl_seconds == 0 {
            let _: () = conn.set(key, body).await?;
        } else {
            let _: () = conn.set_ex(key, body, ttl_seconds).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AdapterError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
