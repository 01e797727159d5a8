//! Cache key generation

use std::fmt;

/// A structured cache key that can be converted to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single mint projection
    Mint(String),
    /// One page of a mint's trades
    Trades { mint: String, offset: i64, limit: i64 },
    /// Klines of one interval over a time window
    Klines {
        mint: String,
        interval: String,
        start_time: i64,
        end_time: i64,
    },
}

impl CacheKey {
    pub fn mint(mint: &str) -> Self {
        Self::Mint(mint.to_string())
    }

    pub fn trades(mint: &str, offset: i64, limit: i64) -> Self {
        Self::Trades {
            mint: mint.to_string(),
            offset,
            limit,
        }
    }

    pub fn klines(mint: &str, interval: &str, start_time: i64, end_time: i64) -> Self {
        Self::Klines {
            mint: mint.to_string(),
            interval: interval.to_string(),
            start_time,
            end_time,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mint(mint) => write!(f, "mint:{}", mint),
            Self::Trades { mint, offset, limit } => {
                write!(f, "trades:{}:{}:{}", mint, offset, limit)
            }
            Self::Klines {
                mint,
                interval,
                start_time,
                end_time,
            } => write!(f, "klines:{}:{}:{}:{}", mint, interval, start_time, end_time),
        }
    }
}
