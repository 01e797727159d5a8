//! Query result cache implementation using Moka

use super::keys::CacheKey;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// TTL-bounded cache for one kind of query result
#[derive(Clone)]
pub struct QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<CacheKey, V>,
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let result = self.cache.get(key).await;
        if result.is_some() {
            debug!("Cache hit for key: {}", key);
        } else {
            debug!("Cache miss for key: {}", key);
        }
        result
    }

    pub async fn insert(&self, key: CacheKey, value: V) {
        debug!("Caching result for key: {}", key);
        self.cache.insert(key, value).await;
    }
}
