//! Key/value cache layer
//!
//! A read-through accelerator in front of the relational store. Nothing in
//! here is a system of record: callers treat every error as a miss.
//!
//! - `KvCache`: object-safe cache trait (string values, optional TTL)
//! - `RedisCache`: Redis implementation over a shared `ConnectionManager`
//! - `MemoryCache`: process-local implementation (tests, single-node dev)
//! - `CacheKey`: key scheme shared by writers and readers

mod error;
mod keys;
mod memory;

pub use error::{CacheError, CacheResult};
pub use keys::CacheKey;
pub use memory::MemoryCache;

use anyhow::Context;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Default per-operation budget for Redis round trips
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Core cache operations
#[async_trait::async_trait]
pub trait KvCache: Send + Sync {
    /// Get a raw value
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a raw value; `None` keeps the entry until it is deleted
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Set several values in one round trip
    async fn set_many(&self, items: Vec<(String, String)>, ttl: Option<Duration>)
        -> CacheResult<()>;

    /// Delete keys (missing keys are ignored)
    async fn del(&self, keys: &[String]) -> CacheResult<()>;
}

/// Read a JSON value. Undecodable entries are reported as a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn KvCache,
    key: &str,
) -> CacheResult<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache deserialization failed");
                Ok(None)
            }
        },
        None => {
            debug!(key = %key, "Cache miss");
            Ok(None)
        }
    }
}

/// Encode a value for `KvCache::set` / `KvCache::set_many`
pub fn to_json<T: Serialize>(value: &T) -> CacheResult<String> {
    serde_json::to_string(value).map_err(CacheError::Serialization)
}

/// Redis-backed cache
#[derive(Clone)]
pub struct RedisCache {
    redis: SharedConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self {
            redis,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Open a connection manager for `redis_url`
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url).context("failed to parse REDIS_URL connection string")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    async fn bounded<T, F>(&self, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::Redis),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait::async_trait]
impl KvCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.lock().await.clone();
        self.bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.redis.lock().await.clone();
        self.bounded(async move {
            match ttl {
                Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await,
                None => conn.set::<_, _, ()>(key, value).await,
            }
        })
        .await?;

        debug!(key = %key, "Cache set");
        Ok(())
    }

    async fn set_many(
        &self,
        items: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let count = items.len();
        let mut pipe = redis::pipe();
        for (key, value) in items {
            match ttl {
                Some(ttl) => pipe.set_ex(key, value, ttl.as_secs().max(1)).ignore(),
                None => pipe.set(key, value).ignore(),
            };
        }

        let mut conn = self.redis.lock().await.clone();
        self.bounded(async move { pipe.query_async::<_, ()>(&mut conn).await })
            .await?;

        debug!(count, "Cache pipeline set");
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.lock().await.clone();
        let owned = keys.to_vec();
        self.bounded(async move { conn.del::<_, ()>(owned).await })
            .await?;

        debug!(count = keys.len(), "Cache delete");
        Ok(())
    }
}
