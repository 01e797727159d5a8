// Rows of the five persisted tables and the enums stored in them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Processing => "processing",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "processing" => Ok(SyncStatus::Processing),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// Which worker produced a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSource {
    Backfill,
    Realtime,
}

impl RangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeSource::Backfill => "backfill",
            RangeSource::Realtime => "realtime",
        }
    }
}

impl FromStr for RangeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backfill" => Ok(RangeSource::Backfill),
            "realtime" => Ok(RangeSource::Realtime),
            other => Err(format!("unknown range source: {}", other)),
        }
    }
}

/// A span of history `[start_tx, end_tx)` and how far its processing got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRange {
    pub id: i64,
    pub start_tx: String,
    pub end_tx: String,
    pub status: SyncStatus,
    pub source: RangeSource,
    pub processed_tx: Option<String>,
    /// `before` cursor of the page that was in flight; pages newer than it
    /// are done.
    pub cursor_tx: Option<String>,
    pub retry_of: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct MintProjection {
    pub mint: String,
    pub pool_state: String,
    pub platform_config: Option<String>,
    pub creator: Option<String>,
    pub global_config: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
    pub decimals: Option<i64>,
    pub supply: Option<String>,
    pub total_base_sell: Option<String>,
    pub total_quote_fund_raising: Option<String>,
    pub migrate_type: Option<i64>,
    pub total_locked_amount: Option<String>,
    pub cliff_period: Option<String>,
    pub unlock_period: Option<String>,
    pub virtual_base: String,
    pub virtual_quote: String,
    pub real_base: String,
    pub real_quote: String,
    pub pool_status: String,
    pub last_trade_slot: Option<i64>,
    pub last_trade_id: Option<i64>,
    pub created_signature: Option<String>,
    pub created_block_time: Option<i64>,
    pub created_slot: Option<i64>,
    pub updated_signature: Option<String>,
    pub updated_block_time: Option<i64>,
}

impl MintProjection {
    /// Rows created by a trade before their pool creation was seen.
    pub fn is_placeholder(&self) -> bool {
        self.created_signature.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TradeRecord {
    pub id: i64,
    pub signature: String,
    pub mint: String,
    pub pool_state: String,
    pub platform_config: String,
    pub user: String,
    pub total_base_sell: String,
    pub virtual_base: String,
    pub virtual_quote: String,
    pub real_base_before: String,
    pub real_quote_before: String,
    pub real_base_after: String,
    pub real_quote_after: String,
    pub amount_in: String,
    pub amount_out: String,
    pub protocol_fee: String,
    pub platform_fee: String,
    pub share_fee: String,
    pub trade_direction: String,
    pub pool_status: String,
    pub slot: i64,
    pub block_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ErrorRecord {
    pub id: i64,
    pub signature: String,
    pub error: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "12h")]
    TwelveHours,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 5] = [
        KlineInterval::OneMinute,
        KlineInterval::FiveMinutes,
        KlineInterval::ThirtyMinutes,
        KlineInterval::TwoHours,
        KlineInterval::TwelveHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::ThirtyMinutes => "30m",
            KlineInterval::TwoHours => "2h",
            KlineInterval::TwelveHours => "12h",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            KlineInterval::OneMinute => 60,
            KlineInterval::FiveMinutes => 5 * 60,
            KlineInterval::ThirtyMinutes => 30 * 60,
            KlineInterval::TwoHours => 2 * 60 * 60,
            KlineInterval::TwelveHours => 12 * 60 * 60,
        }
    }

    /// Start of the bucket containing `block_time`.
    pub fn bucket_start(&self, block_time: i64) -> i64 {
        block_time - block_time.rem_euclid(self.seconds())
    }
}

impl FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KlineInterval::ALL
            .iter()
            .find(|interval| interval.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown kline interval: {}", s))
    }
}

/// One OHLC bucket. Prices are quote per base in raw token units.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Kline {
    pub mint: String,
    pub interval: String,
    pub interval_start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_time: i64,
    pub close_time: i64,
    pub base_volume: String,
    pub quote_volume: String,
    pub trade_count: i64,
}
