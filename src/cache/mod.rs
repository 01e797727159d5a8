pub mod keys;
pub mod query;

pub use keys::CacheKey;
pub use query::QueryCache;

use crate::config::Config;
use crate::models::{Kline, MintProjection, TradeRecord};

/// Caches behind the read API, one per endpoint.
#[derive(Clone)]
pub struct AppCache {
    pub mints: QueryCache<MintProjection>,
    pub trades: QueryCache<(Vec<TradeRecord>, i64)>,
    pub klines: QueryCache<Vec<Kline>>,
}

pub fn init_cache(config: &Config) -> AppCache {
    AppCache {
        mints: QueryCache::new(config.cache_max_capacity, config.cache_ttl),
        trades: QueryCache::new(config.cache_max_capacity, config.cache_ttl),
        klines: QueryCache::new(config.cache_max_capacity, config.cache_ttl),
    }
}
