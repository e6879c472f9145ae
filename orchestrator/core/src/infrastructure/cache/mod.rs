// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cache Adapters
//!
//! JSON values with a per-entry TTL. A TTL of 0 stores the entry without expiry.

pub mod redis;

pub use self::redis::RedisCache;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::stores::{AdapterError, CacheStore};

#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, (Value, Option<Instant>)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, AdapterError> {
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires)) => match expires {
                    Some(at) if *at <= Instant::now() => true,
                    _ => return Ok(Some(value.clone())),
                },
            }
        };
        if expired {
            self.entries.write().await.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), AdapterError> {
        let expires = (ttl_seconds > 0).then(|| Instant::now() + Duration::from_secs(ttl_seconds));
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.clone(), expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AdapterError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}
