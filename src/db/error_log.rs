use crate::db::now_millis;
use crate::models::ErrorRecord;
use sqlx::{Pool, Sqlite};

pub async fn record_error(
    pool: &Pool<Sqlite>,
    signature: &str,
    error: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO errors (signature, error, created_at) VALUES (?, ?, ?)")
        .bind(signature)
        .bind(error)
        .bind(now_millis())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn errors_for_signature(
    pool: &Pool<Sqlite>,
    signature: &str,
) -> Result<Vec<ErrorRecord>, sqlx::Error> {
    sqlx::query_as::<_, ErrorRecord>(
        "SELECT id, signature, error, created_at FROM errors WHERE signature = ? ORDER BY id ASC",
    )
    .bind(signature)
    .fetch_all(pool)
    .await
}

pub async fn recent_errors(pool: &Pool<Sqlite>, limit: i64) -> Result<Vec<ErrorRecord>, sqlx::Error> {
    sqlx::query_as::<_, ErrorRecord>(
        "SELECT id, signature, error, created_at FROM errors ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
