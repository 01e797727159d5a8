use crate::models::{Kline, KlineInterval};
use sqlx::{Pool, Sqlite, SqliteConnection};

pub async fn get_kline(
    conn: &mut SqliteConnection,
    mint: &str,
    interval: KlineInterval,
    interval_start: i64,
) -> Result<Option<Kline>, sqlx::Error> {
    sqlx::query_as::<_, Kline>(
        "SELECT * FROM klines WHERE mint = ? AND interval = ? AND interval_start = ?",
    )
    .bind(mint)
    .bind(interval.as_str())
    .bind(interval_start)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn upsert_kline(conn: &mut SqliteConnection, kline: &Kline) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO klines
        (mint, interval, interval_start, open, high, low, close, open_time, close_time,
         base_volume, quote_volume, trade_count)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(mint, interval, interval_start) DO UPDATE SET
            open = excluded.open,
            high = excluded.high,
            low = excluded.low,
            close = excluded.close,
            open_time = excluded.open_time,
            close_time = excluded.close_time,
            base_volume = excluded.base_volume,
            quote_volume = excluded.quote_volume,
            trade_count = excluded.trade_count
        "#,
    )
    .bind(&kline.mint)
    .bind(&kline.interval)
    .bind(kline.interval_start)
    .bind(kline.open)
    .bind(kline.high)
    .bind(kline.low)
    .bind(kline.close)
    .bind(kline.open_time)
    .bind(kline.close_time)
    .bind(&kline.base_volume)
    .bind(&kline.quote_volume)
    .bind(kline.trade_count)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Buckets starting in `[start_time, end_time)`, oldest first.
pub async fn get_klines(
    pool: &Pool<Sqlite>,
    mint: &str,
    interval: KlineInterval,
    start_time: i64,
    end_time: i64,
) -> Result<Vec<Kline>, sqlx::Error> {
    sqlx::query_as::<_, Kline>(
        r#"SELECT * FROM klines
           WHERE mint = ? AND interval = ? AND interval_start >= ? AND interval_start < ?
           ORDER BY interval_start ASC"#,
    )
    .bind(mint)
    .bind(interval.as_str())
    .bind(start_time)
    .bind(end_time)
    .fetch_all(pool)
    .await
}
