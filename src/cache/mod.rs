use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};

use crate::redis_client::RedisClient;

pub mod layouts;
mod memory;

pub use memory::MemoryCache;

/// The handful of key-value commands the cache needs.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> RedisResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> RedisResult<()>;

    /// Increments an integer key, treating a missing key as 0.
    async fn incr(&self, key: &str) -> RedisResult<i64>;
}

#[async_trait]
impl CacheBackend for RedisClient {
    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    async fn incr(&self, key: &str) -> RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await
    }
}

/// Read-through cache in front of the store. Every failure is swallowed and
/// the caller falls back to the store; with no backend configured it is inert.
#[derive(Clone)]
pub struct CacheService {
    backend: Option<Arc<dyn CacheBackend>>,
    layout_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, layout_ttl_secs: u64) -> Self {
        Self::with_backend(Arc::new(redis), layout_ttl_secs)
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>, layout_ttl_secs: u64) -> Self {
        Self {
            backend: Some(backend),
            layout_ttl_secs,
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            layout_ttl_secs: 0,
        }
    }
}
