use crate::models::MintProjection;
use crate::projector::TradeSource;
use sqlx::{Pool, Sqlite, SqliteConnection};

/// Everything a pool creation tells us about a mint.
#[derive(Debug, Clone)]
pub struct NewMint {
    pub mint: String,
    pub pool_state: String,
    pub platform_config: Option<String>,
    pub creator: String,
    pub global_config: String,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub decimals: u8,
    pub supply: u64,
    pub total_base_sell: u64,
    pub total_quote_fund_raising: u64,
    pub migrate_type: u8,
    pub total_locked_amount: u64,
    pub cliff_period: u64,
    pub unlock_period: u64,
    pub signature: String,
    pub block_time: i64,
    pub slot: u64,
}

/// Pool balances as of one trade.
#[derive(Debug, Clone)]
pub struct PoolState {
    pub virtual_base: u64,
    pub virtual_quote: u64,
    pub real_base: u64,
    pub real_quote: u64,
    pub pool_status: String,
    pub signature: String,
    pub block_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintWrite {
    Inserted,
    /// A trade-created placeholder received its creation metadata.
    CompletedPlaceholder,
    AlreadyExists,
}

pub async fn insert_created(
    conn: &mut SqliteConnection,
    mint: &NewMint,
) -> Result<MintWrite, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO mints
        (mint, pool_state, platform_config, creator, global_config, name, symbol, uri, decimals,
         supply, total_base_sell, total_quote_fund_raising, migrate_type,
         total_locked_amount, cliff_period, unlock_period,
         created_signature, created_block_time, created_slot, updated_signature, updated_block_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(mint) DO NOTHING
        "#,
    )
    .bind(&mint.mint)
    .bind(&mint.pool_state)
    .bind(&mint.platform_config)
    .bind(&mint.creator)
    .bind(&mint.global_config)
    .bind(&mint.name)
    .bind(&mint.symbol)
    .bind(&mint.uri)
    .bind(mint.decimals as i64)
    .bind(mint.supply.to_string())
    .bind(mint.total_base_sell.to_string())
    .bind(mint.total_quote_fund_raising.to_string())
    .bind(mint.migrate_type as i64)
    .bind(mint.total_locked_amount.to_string())
    .bind(mint.cliff_period.to_string())
    .bind(mint.unlock_period.to_string())
    .bind(&mint.signature)
    .bind(mint.block_time)
    .bind(mint.slot as i64)
    .bind(&mint.signature)
    .bind(mint.block_time)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 1 {
        return Ok(MintWrite::Inserted);
    }

    // Existing row: fill in creation metadata only if it is a placeholder.
    // Trade-derived balances and the last-trade pointer are kept.
    let completed = sqlx::query(
        r#"
        UPDATE mints SET
            pool_state = ?, platform_config = COALESCE(?, platform_config),
            creator = ?, global_config = ?, name = ?, symbol = ?, uri = ?, decimals = ?,
            supply = ?, total_base_sell = ?, total_quote_fund_raising = ?, migrate_type = ?,
            total_locked_amount = ?, cliff_period = ?, unlock_period = ?,
            created_signature = ?, created_block_time = ?, created_slot = ?
        WHERE mint = ? AND created_signature IS NULL
        "#,
    )
    .bind(&mint.pool_state)
    .bind(&mint.platform_config)
    .bind(&mint.creator)
    .bind(&mint.global_config)
    .bind(&mint.name)
    .bind(&mint.symbol)
    .bind(&mint.uri)
    .bind(mint.decimals as i64)
    .bind(mint.supply.to_string())
    .bind(mint.total_base_sell.to_string())
    .bind(mint.total_quote_fund_raising.to_string())
    .bind(mint.migrate_type as i64)
    .bind(mint.total_locked_amount.to_string())
    .bind(mint.cliff_period.to_string())
    .bind(mint.unlock_period.to_string())
    .bind(&mint.signature)
    .bind(mint.block_time)
    .bind(mint.slot as i64)
    .bind(&mint.mint)
    .execute(&mut *conn)
    .await?;

    if completed.rows_affected() == 1 {
        Ok(MintWrite::CompletedPlaceholder)
    } else {
        Ok(MintWrite::AlreadyExists)
    }
}

/// Minimal row for a pool whose creation has not been indexed yet.
pub async fn insert_placeholder(
    conn: &mut SqliteConnection,
    mint: &str,
    pool_state: &str,
    platform_config: &str,
    state: &PoolState,
    last_trade_slot: u64,
    last_trade_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO mints
        (mint, pool_state, platform_config, virtual_base, virtual_quote, real_base, real_quote,
         pool_status, last_trade_slot, last_trade_id, updated_signature, updated_block_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(mint) DO NOTHING
        "#,
    )
    .bind(mint)
    .bind(pool_state)
    .bind(platform_config)
    .bind(state.virtual_base.to_string())
    .bind(state.virtual_quote.to_string())
    .bind(state.real_base.to_string())
    .bind(state.real_quote.to_string())
    .bind(&state.pool_status)
    .bind(last_trade_slot as i64)
    .bind(last_trade_id)
    .bind(&state.signature)
    .bind(state.block_time)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_by_pool_state(
    conn: &mut SqliteConnection,
    pool_state: &str,
) -> Result<Option<MintProjection>, sqlx::Error> {
    sqlx::query_as::<_, MintProjection>("SELECT * FROM mints WHERE pool_state = ? LIMIT 1")
        .bind(pool_state)
        .fetch_optional(&mut *conn)
        .await
}

/// Overwrite balances and pool status with the trade's view.
pub async fn apply_pool_state(
    conn: &mut SqliteConnection,
    mint: &str,
    state: &PoolState,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE mints SET
            virtual_base = ?, virtual_quote = ?, real_base = ?, real_quote = ?,
            pool_status = ?, updated_signature = ?, updated_block_time = ?
        WHERE mint = ?
        "#,
    )
    .bind(state.virtual_base.to_string())
    .bind(state.virtual_quote.to_string())
    .bind(state.real_base.to_string())
    .bind(state.real_quote.to_string())
    .bind(&state.pool_status)
    .bind(&state.signature)
    .bind(state.block_time)
    .bind(mint)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Move the last-trade pointer to `(slot, trade_id)` if the slot is newer.
/// Realtime also accepts a trade from the same slot; backfill does not, so
/// replayed history never displaces what the live feed already recorded.
pub async fn advance_last_trade(
    conn: &mut SqliteConnection,
    mint: &str,
    slot: u64,
    trade_id: i64,
    source: TradeSource,
) -> Result<bool, sqlx::Error> {
    let sql = match source {
        TradeSource::Backfill => {
            "UPDATE mints SET last_trade_slot = ?, last_trade_id = ?
             WHERE mint = ? AND (last_trade_slot IS NULL OR last_trade_slot < ?)"
        }
        TradeSource::Realtime => {
            "UPDATE mints SET last_trade_slot = ?, last_trade_id = ?
             WHERE mint = ? AND (last_trade_slot IS NULL OR last_trade_slot <= ?)"
        }
    };

    let result = sqlx::query(sql)
        .bind(slot as i64)
        .bind(trade_id)
        .bind(mint)
        .bind(slot as i64)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_mint(pool: &Pool<Sqlite>, mint: &str) -> Result<Option<MintProjection>, sqlx::Error> {
    sqlx::query_as::<_, MintProjection>("SELECT * FROM mints WHERE mint = ?")
        .bind(mint)
        .fetch_optional(pool)
        .await
}

pub async fn count_mints(pool: &Pool<Sqlite>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM mints")
        .fetch_one(pool)
        .await
}
