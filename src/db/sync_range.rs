// Persistence for sync ranges. Status moves pending -> processing ->
// completed | failed; the claim is a conditional update so only one worker
// ever wins a pending range.

use crate::db::now_millis;
use crate::models::{RangeSource, SyncRange, SyncStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

const RANGE_COLUMNS: &str = "id, start_tx, end_tx, status, source, processed_tx, cursor_tx, \
                             retry_of, created_at, updated_at";

fn range_from_row(row: &SqliteRow) -> Result<SyncRange, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let source: String = row.try_get("source")?;

    Ok(SyncRange {
        id: row.try_get("id")?,
        start_tx: row.try_get("start_tx")?,
        end_tx: row.try_get("end_tx")?,
        status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        source: source.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        processed_tx: row.try_get("processed_tx")?,
        cursor_tx: row.try_get("cursor_tx")?,
        retry_of: row.try_get("retry_of")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a pending backfill range and return its id.
pub async fn create_range(
    pool: &Pool<Sqlite>,
    start_tx: &str,
    end_tx: &str,
    retry_of: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let now = now_millis();
    let result = sqlx::query(
        "INSERT INTO sync_ranges (start_tx, end_tx, status, source, retry_of, created_at, updated_at)
         VALUES (?, ?, 'pending', 'backfill', ?, ?, ?)",
    )
    .bind(start_tx)
    .bind(end_tx)
    .bind(retry_of)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Open a live range covering a single signature the realtime worker just
/// processed.
pub async fn create_live_range(pool: &Pool<Sqlite>, signature: &str) -> Result<i64, sqlx::Error> {
    let now = now_millis();
    let result = sqlx::query(
        "INSERT INTO sync_ranges (start_tx, end_tx, status, source, processed_tx, created_at, updated_at)
         VALUES (?, ?, 'processing', 'realtime', ?, ?, ?)",
    )
    .bind(signature)
    .bind(signature)
    .bind(signature)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Move the newest end of a live range forward.
pub async fn extend_live_range(
    pool: &Pool<Sqlite>,
    id: i64,
    signature: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE sync_ranges SET end_tx = ?, processed_tx = ?, updated_at = ? WHERE id = ?",
    )
    .bind(signature)
    .bind(signature)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_range(pool: &Pool<Sqlite>, id: i64) -> Result<Option<SyncRange>, sqlx::Error> {
    let sql = format!("SELECT {} FROM sync_ranges WHERE id = ?", RANGE_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(range_from_row).transpose()
}

/// The oldest pending range, if any.
pub async fn next_pending(pool: &Pool<Sqlite>) -> Result<Option<SyncRange>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM sync_ranges WHERE status = 'pending' ORDER BY created_at ASC, id ASC LIMIT 1",
        RANGE_COLUMNS
    );
    let row = sqlx::query(&sql).fetch_optional(pool).await?;
    row.as_ref().map(range_from_row).transpose()
}

/// Atomically move a range from pending to processing. Returns `false` when
/// another worker got there first.
pub async fn claim(pool: &Pool<Sqlite>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sync_ranges SET status = 'processing', updated_at = ?
         WHERE id = ? AND status = 'pending'",
    )
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Pick the oldest pending range and claim it. `None` if there is nothing
/// pending or the claim was lost.
pub async fn claim_next_pending(pool: &Pool<Sqlite>) -> Result<Option<SyncRange>, sqlx::Error> {
    let Some(mut range) = next_pending(pool).await? else {
        return Ok(None);
    };

    if !claim(pool, range.id).await? {
        return Ok(None);
    }

    range.status = SyncStatus::Processing;
    Ok(Some(range))
}

/// Record the last signature fully processed inside a range.
pub async fn checkpoint(
    pool: &Pool<Sqlite>,
    id: i64,
    processed_tx: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sync_ranges SET processed_tx = ?, updated_at = ? WHERE id = ?")
        .bind(processed_tx)
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Record the `before` cursor of the page about to be processed.
pub async fn set_cursor(pool: &Pool<Sqlite>, id: i64, cursor_tx: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sync_ranges SET cursor_tx = ?, updated_at = ? WHERE id = ?")
        .bind(cursor_tx)
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Finish a processing range. Ranges in any other state are left alone.
pub async fn finish(
    pool: &Pool<Sqlite>,
    id: i64,
    status: SyncStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sync_ranges SET status = ?, updated_at = ? WHERE id = ? AND status = 'processing'",
    )
    .bind(status.as_str())
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Every range of one source in creation order.
pub async fn list_by_source(
    pool: &Pool<Sqlite>,
    source: RangeSource,
) -> Result<Vec<SyncRange>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM sync_ranges WHERE source = ? ORDER BY created_at ASC, id ASC",
        RANGE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(source.as_str())
        .fetch_all(pool)
        .await?;

    rows.iter().map(range_from_row).collect()
}

pub async fn exists_with_bounds(
    pool: &Pool<Sqlite>,
    start_tx: &str,
    end_tx: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM sync_ranges WHERE start_tx = ? AND end_tx = ? LIMIT 1")
        .bind(start_tx)
        .bind(end_tx)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

/// Fail backfill ranges stuck in processing since before `older_than`
/// (epoch millis). Returns how many were failed.
pub async fn fail_stale(pool: &Pool<Sqlite>, older_than: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sync_ranges SET status = 'failed', updated_at = ?
         WHERE status = 'processing' AND source = 'backfill' AND updated_at < ?",
    )
    .bind(now_millis())
    .bind(older_than)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Failed ranges that no other range retries yet, each with how many
/// re-filings precede it in its `retry_of` chain.
pub async fn failed_without_retry(
    pool: &Pool<Sqlite>,
) -> Result<Vec<(SyncRange, i64)>, sqlx::Error> {
    let sql = format!(
        "WITH RECURSIVE chain(range_id, depth) AS (
             SELECT id, 0 FROM sync_ranges WHERE retry_of IS NULL
             UNION ALL
             SELECT s.id, chain.depth + 1 FROM sync_ranges s JOIN chain ON s.retry_of = chain.range_id
         )
         SELECT {}, chain.depth AS retries FROM sync_ranges r
         JOIN chain ON chain.range_id = r.id
         WHERE r.status = 'failed'
           AND NOT EXISTS (SELECT 1 FROM sync_ranges c WHERE c.retry_of = r.id)
         ORDER BY r.created_at ASC, r.id ASC",
        RANGE_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<(SyncRange, i64), sqlx::Error> {
            Ok((range_from_row(row)?, row.try_get("retries")?))
        })
        .collect()
}

/// Most recently created ranges first, for the status endpoint.
pub async fn list_ranges(
    pool: &Pool<Sqlite>,
    status: Option<SyncStatus>,
    offset: i64,
    limit: i64,
) -> Result<(Vec<SyncRange>, i64), sqlx::Error> {
    let status = status.map(|s| s.as_str());

    let total_count = sqlx::query("SELECT COUNT(*) FROM sync_ranges WHERE (? IS NULL OR status = ?)")
        .bind(status)
        .bind(status)
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    let sql = format!(
        "SELECT {} FROM sync_ranges WHERE (? IS NULL OR status = ?)
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        RANGE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(status)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let ranges = rows.iter().map(range_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok((ranges, total_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection;

    #[tokio::test]
    async fn claim_succeeds_once() {
        let pool = connection::in_memory().await.expect("db");
        let id = create_range(&pool, "old", "new", None).await.expect("insert");

        assert!(claim(&pool, id).await.expect("first claim"));
        assert!(!claim(&pool, id).await.expect("second claim"));

        let range = get_range(&pool, id).await.expect("get").expect("range");
        assert_eq!(range.status, SyncStatus::Processing);
        assert_eq!(range.source, RangeSource::Backfill);
    }

    #[tokio::test]
    async fn claim_next_pending_takes_oldest_first() {
        let pool = connection::in_memory().await.expect("db");
        let first = create_range(&pool, "a", "b", None).await.expect("insert");
        let second = create_range(&pool, "c", "d", None).await.expect("insert");

        let claimed = claim_next_pending(&pool).await.expect("claim").expect("range");
        assert_eq!(claimed.id, first);
        let claimed = claim_next_pending(&pool).await.expect("claim").expect("range");
        assert_eq!(claimed.id, second);
        assert!(claim_next_pending(&pool).await.expect("claim").is_none());
    }

    #[tokio::test]
    async fn finish_only_applies_to_processing_ranges() {
        let pool = connection::in_memory().await.expect("db");
        let id = create_range(&pool, "a", "b", None).await.expect("insert");

        assert!(!finish(&pool, id, SyncStatus::Completed).await.expect("finish"));
        claim(&pool, id).await.expect("claim");
        assert!(finish(&pool, id, SyncStatus::Completed).await.expect("finish"));

        let range = get_range(&pool, id).await.expect("get").expect("range");
        assert_eq!(range.status, SyncStatus::Completed);
    }

    #[tokio::test]
    async fn live_range_extends_its_end() {
        let pool = connection::in_memory().await.expect("db");
        let id = create_live_range(&pool, "s1").await.expect("insert");
        extend_live_range(&pool, id, "s2").await.expect("extend");

        let range = get_range(&pool, id).await.expect("get").expect("range");
        assert_eq!(range.start_tx, "s1");
        assert_eq!(range.end_tx, "s2");
        assert_eq!(range.processed_tx.as_deref(), Some("s2"));
        assert_eq!(range.status, SyncStatus::Processing);
        assert_eq!(range.source, RangeSource::Realtime);
    }

    #[tokio::test]
    async fn failed_ranges_with_a_retry_are_not_listed() {
        let pool = connection::in_memory().await.expect("db");
        let a = create_range(&pool, "a", "b", None).await.expect("insert");
        let b = create_range(&pool, "c", "d", None).await.expect("insert");
        for id in [a, b] {
            claim(&pool, id).await.expect("claim");
            finish(&pool, id, SyncStatus::Failed).await.expect("fail");
        }
        create_range(&pool, "a", "b", Some(a)).await.expect("retry");

        let unrecovered = failed_without_retry(&pool).await.expect("query");
        assert_eq!(unrecovered.len(), 1);
        assert_eq!(unrecovered[0].0.id, b);
        assert_eq!(unrecovered[0].1, 0);
    }

    #[tokio::test]
    async fn failed_retries_report_their_chain_depth() {
        let pool = connection::in_memory().await.expect("db");
        let mut retry_of = None;
        for _ in 0..3 {
            let id = create_range(&pool, "a", "b", retry_of).await.expect("insert");
            claim(&pool, id).await.expect("claim");
            finish(&pool, id, SyncStatus::Failed).await.expect("fail");
            retry_of = Some(id);
        }

        let unrecovered = failed_without_retry(&pool).await.expect("query");
        assert_eq!(unrecovered.len(), 1);
        assert_eq!(Some(unrecovered[0].0.id), retry_of);
        assert_eq!(unrecovered[0].1, 2);
    }

    #[tokio::test]
    async fn list_ranges_filters_by_status() {
        let pool = connection::in_memory().await.expect("db");
        let a = create_range(&pool, "a", "b", None).await.expect("insert");
        create_range(&pool, "c", "d", None).await.expect("insert");
        claim(&pool, a).await.expect("claim");

        let (all, total) = list_ranges(&pool, None, 0, 10).await.expect("list");
        assert_eq!((all.len(), total), (2, 2));

        let (processing, total) = list_ranges(&pool, Some(SyncStatus::Processing), 0, 10)
            .await
            .expect("list");
        assert_eq!(total, 1);
        assert_eq!(processing[0].id, a);
    }
}
