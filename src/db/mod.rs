pub mod connection;
pub mod error_log;
pub mod kline;
pub mod mint;
pub mod sync_range;
pub mod trade;

/// Milliseconds since the Unix epoch, the unit of every `*_at` column.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const INIT_SCHEMA: &str = r#"
-- Spans of program history and their processing state
CREATE TABLE IF NOT EXISTS sync_ranges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_tx TEXT NOT NULL,
    end_tx TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    source TEXT NOT NULL DEFAULT 'backfill' CHECK (source IN ('backfill', 'realtime')),
    processed_tx TEXT,
    cursor_tx TEXT,
    retry_of INTEGER REFERENCES sync_ranges(id),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- One row per launched token, keyed by its base mint
CREATE TABLE IF NOT EXISTS mints (
    mint TEXT PRIMARY KEY,
    pool_state TEXT NOT NULL,
    platform_config TEXT,
    creator TEXT,
    global_config TEXT,
    name TEXT,
    symbol TEXT,
    uri TEXT,
    decimals INTEGER,
    supply TEXT,
    total_base_sell TEXT,
    total_quote_fund_raising TEXT,
    migrate_type INTEGER,
    total_locked_amount TEXT,
    cliff_period TEXT,
    unlock_period TEXT,
    virtual_base TEXT NOT NULL DEFAULT '0',
    virtual_quote TEXT NOT NULL DEFAULT '0',
    real_base TEXT NOT NULL DEFAULT '0',
    real_quote TEXT NOT NULL DEFAULT '0',
    pool_status TEXT NOT NULL DEFAULT 'Fund',
    last_trade_slot INTEGER,
    last_trade_id INTEGER,
    created_signature TEXT,
    created_block_time INTEGER,
    created_slot INTEGER,
    updated_signature TEXT,
    updated_block_time INTEGER
);

-- One row per trade transaction
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    signature TEXT NOT NULL UNIQUE,
    mint TEXT NOT NULL,
    pool_state TEXT NOT NULL,
    platform_config TEXT NOT NULL,
    user TEXT NOT NULL,
    total_base_sell TEXT NOT NULL,
    virtual_base TEXT NOT NULL,
    virtual_quote TEXT NOT NULL,
    real_base_before TEXT NOT NULL,
    real_quote_before TEXT NOT NULL,
    real_base_after TEXT NOT NULL,
    real_quote_after TEXT NOT NULL,
    amount_in TEXT NOT NULL,
    amount_out TEXT NOT NULL,
    protocol_fee TEXT NOT NULL,
    platform_fee TEXT NOT NULL,
    share_fee TEXT NOT NULL,
    trade_direction TEXT NOT NULL,
    pool_status TEXT NOT NULL,
    slot INTEGER NOT NULL,
    block_time INTEGER NOT NULL
);

-- Signatures that could not be processed
CREATE TABLE IF NOT EXISTS errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    signature TEXT NOT NULL,
    error TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- OHLC buckets per mint and interval
CREATE TABLE IF NOT EXISTS klines (
    mint TEXT NOT NULL,
    interval TEXT NOT NULL,
    interval_start INTEGER NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    open_time INTEGER NOT NULL,
    close_time INTEGER NOT NULL,
    base_volume TEXT NOT NULL,
    quote_volume TEXT NOT NULL,
    trade_count INTEGER NOT NULL,
    PRIMARY KEY (mint, interval, interval_start)
);

-- Create indexes for efficient querying
CREATE INDEX IF NOT EXISTS idx_sync_ranges_status ON sync_ranges(status, created_at);
CREATE INDEX IF NOT EXISTS idx_sync_ranges_source_updated ON sync_ranges(source, updated_at);
CREATE INDEX IF NOT EXISTS idx_sync_ranges_retry_of ON sync_ranges(retry_of);
CREATE INDEX IF NOT EXISTS idx_mints_pool_state ON mints(pool_state);
CREATE INDEX IF NOT EXISTS idx_mints_creator ON mints(creator);
CREATE INDEX IF NOT EXISTS idx_mints_platform_config ON mints(platform_config);
CREATE INDEX IF NOT EXISTS idx_trades_mint_time ON trades(mint, block_time);
CREATE INDEX IF NOT EXISTS idx_trades_mint_user ON trades(mint, user);
CREATE INDEX IF NOT EXISTS idx_errors_signature ON errors(signature);
"#;
