use crate::models::TradeRecord;
use sqlx::{Pool, Row, Sqlite, SqliteConnection};

#[derive(Debug, Clone)]
pub struct NewTrade {
    pub signature: String,
    pub mint: String,
    pub pool_state: String,
    pub platform_config: String,
    pub user: String,
    pub total_base_sell: u64,
    pub virtual_base: u64,
    pub virtual_quote: u64,
    pub real_base_before: u64,
    pub real_quote_before: u64,
    pub real_base_after: u64,
    pub real_quote_after: u64,
    pub amount_in: u64,
    pub amount_out: u64,
    pub protocol_fee: u64,
    pub platform_fee: u64,
    pub share_fee: u64,
    pub trade_direction: String,
    pub pool_status: String,
    pub slot: u64,
    pub block_time: i64,
}

/// Insert a trade, keeping the first write for a signature. Returns the
/// stored row id and whether this call inserted it.
pub async fn insert_trade(
    conn: &mut SqliteConnection,
    trade: &NewTrade,
) -> Result<(i64, bool), sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO trades
        (signature, mint, pool_state, platform_config, user, total_base_sell,
         virtual_base, virtual_quote, real_base_before, real_quote_before,
         real_base_after, real_quote_after, amount_in, amount_out,
         protocol_fee, platform_fee, share_fee, trade_direction, pool_status, slot, block_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(signature) DO NOTHING
        "#,
    )
    .bind(&trade.signature)
    .bind(&trade.mint)
    .bind(&trade.pool_state)
    .bind(&trade.platform_config)
    .bind(&trade.user)
    .bind(trade.total_base_sell.to_string())
    .bind(trade.virtual_base.to_string())
    .bind(trade.virtual_quote.to_string())
    .bind(trade.real_base_before.to_string())
    .bind(trade.real_quote_before.to_string())
    .bind(trade.real_base_after.to_string())
    .bind(trade.real_quote_after.to_string())
    .bind(trade.amount_in.to_string())
    .bind(trade.amount_out.to_string())
    .bind(trade.protocol_fee.to_string())
    .bind(trade.platform_fee.to_string())
    .bind(trade.share_fee.to_string())
    .bind(&trade.trade_direction)
    .bind(&trade.pool_status)
    .bind(trade.slot as i64)
    .bind(trade.block_time)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok((result.last_insert_rowid(), true));
    }

    let id = sqlx::query("SELECT id FROM trades WHERE signature = ?")
        .bind(&trade.signature)
        .fetch_one(&mut *conn)
        .await?
        .get::<i64, _>("id");

    Ok((id, false))
}

/// Trades of one mint, oldest first, plus the total count.
pub async fn get_trades(
    pool: &Pool<Sqlite>,
    mint: &str,
    offset: i64,
    limit: i64,
) -> Result<(Vec<TradeRecord>, i64), sqlx::Error> {
    let total_count = count_trades(pool, mint).await?;

    let trades = sqlx::query_as::<_, TradeRecord>(
        r#"SELECT * FROM trades
           WHERE mint = ?
           ORDER BY block_time ASC, slot ASC, id ASC
           LIMIT ? OFFSET ?"#,
    )
    .bind(mint)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((trades, total_count))
}

pub async fn count_trades(pool: &Pool<Sqlite>, mint: &str) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM trades WHERE mint = ?")
        .bind(mint)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}

pub async fn get_trade(
    pool: &Pool<Sqlite>,
    signature: &str,
) -> Result<Option<TradeRecord>, sqlx::Error> {
    sqlx::query_as::<_, TradeRecord>("SELECT * FROM trades WHERE signature = ?")
        .bind(signature)
        .fetch_optional(pool)
        .await
}
