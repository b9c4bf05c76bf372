//! Process-local cache
//!
//! Same contract as `RedisCache`, backed by a `HashMap`. Entries past their
//! TTL are dropped lazily on read.

use crate::{CacheResult, KvCache};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryCache {
    data: Arc<RwLock<HashMap<String, (String, Option<Instant>)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let data = self.data.read().await;
        data.values()
            .filter(|(_, expires_at)| expires_at.map_or(true, |at| at > now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn deadline(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|ttl| Instant::now() + ttl)
}

#[async_trait::async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut data = self.data.write().await;
        match data.get(key) {
            Some((_, Some(expires_at))) if *expires_at <= Instant::now() => {
                data.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let mut data = self.data.write().await;
        data.insert(key.to_string(), (value, deadline(ttl)));
        Ok(())
    }

    async fn set_many(
        &self,
        items: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let expires_at = deadline(ttl);
        let mut data = self.data.write().await;
        for (key, value) in items {
            data.insert(key, (value, expires_at));
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<()> {
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }
}
