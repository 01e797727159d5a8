// Runtime configuration, read from the environment (and `.env` if present).

use dotenv::dotenv;
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const LAUNCHLAB_PROGRAM_ID: &str = "LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub solana_rpc_urls: Vec<String>,
    pub solana_websocket_url: String,
    pub program_id: Pubkey,
    /// Only keep events whose accounts mention this platform config.
    pub platform_config: Option<String>,
    /// Anchor for the very first continuity gap.
    pub gap_start_tx: Option<String>,
    pub solana_commitment_level: String,
    pub rpc_timeout_secs: u64,
    pub rpc_rate_limit: Option<u32>,
    pub backfill_page_size: usize,
    pub idle_interval: Duration,
    pub retry_attempts: usize,
    pub retry_min_delay: Duration,
    pub queue_capacity: usize,
    pub stale_range_after: Duration,
    /// Re-filings of one failed range before the gap detector gives up.
    pub max_range_retries: i64,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite:indexer.db".to_string());
        let server_host = var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = parse_or("SERVER_PORT", var("SERVER_PORT"), 8080)?;

        let solana_rpc_urls: Vec<String> = var("SOLANA_RPC_URL")
            .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string())
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        let first_rpc = solana_rpc_urls
            .first()
            .ok_or(ConfigError::Missing("SOLANA_RPC_URL"))?;
        let solana_websocket_url =
            var("SOLANA_WEBSOCKET_URL").unwrap_or_else(|| websocket_url_for(first_rpc));

        let program_id_raw = var("PROGRAM_ID").unwrap_or_else(|| LAUNCHLAB_PROGRAM_ID.to_string());
        let program_id = Pubkey::from_str(&program_id_raw).map_err(|_| ConfigError::Invalid {
            key: "PROGRAM_ID",
            value: program_id_raw.clone(),
        })?;

        let solana_commitment_level =
            var("SOLANA_COMMITMENT_LEVEL").unwrap_or_else(|| "confirmed".to_string());
        let rpc_timeout_secs = parse_or("RPC_TIMEOUT_SECS", var("RPC_TIMEOUT_SECS"), 30)?;
        let rpc_rate_limit = var("RPC_RATE_LIMIT")
            .map(|v| parse_value("RPC_RATE_LIMIT", &v))
            .transpose()?;

        let backfill_page_size = parse_or("BACKFILL_PAGE_SIZE", var("BACKFILL_PAGE_SIZE"), 1000)?;
        if !(1..=1000).contains(&backfill_page_size) {
            return Err(ConfigError::Invalid {
                key: "BACKFILL_PAGE_SIZE",
                value: backfill_page_size.to_string(),
            });
        }

        let idle_interval =
            Duration::from_millis(parse_or("IDLE_INTERVAL_MS", var("IDLE_INTERVAL_MS"), 1000)?);
        let retry_attempts = parse_or("RETRY_ATTEMPTS", var("RETRY_ATTEMPTS"), 3usize)?.max(1);
        let retry_min_delay = Duration::from_millis(parse_or(
            "RETRY_MIN_DELAY_MS",
            var("RETRY_MIN_DELAY_MS"),
            1000,
        )?);
        let queue_capacity = parse_or("QUEUE_CAPACITY", var("QUEUE_CAPACITY"), 10_000usize)?.max(1);
        let stale_range_after =
            Duration::from_secs(parse_or("STALE_RANGE_SECS", var("STALE_RANGE_SECS"), 600)?);
        let max_range_retries = parse_or("MAX_RANGE_RETRIES", var("MAX_RANGE_RETRIES"), 3i64)?.max(0);

        let cache_ttl = Duration::from_secs(parse_or("CACHE_TTL", var("CACHE_TTL"), 60)?);
        let cache_max_capacity =
            parse_or("CACHE_MAX_CAPACITY", var("CACHE_MAX_CAPACITY"), 1000)?;

        Ok(Self {
            database_url,
            server_host,
            server_port,
            solana_rpc_urls,
            solana_websocket_url,
            program_id,
            platform_config: var("PLATFORM_CONFIG_ADDRESS"),
            gap_start_tx: var("GAP_START_TX"),
            solana_commitment_level,
            rpc_timeout_secs,
            rpc_rate_limit,
            backfill_page_size,
            idle_interval,
            retry_attempts,
            retry_min_delay,
            queue_capacity,
            stale_range_after,
            max_range_retries,
            cache_ttl,
            cache_max_capacity,
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn websocket_url_for(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        rpc_url.to_string()
    }
}
