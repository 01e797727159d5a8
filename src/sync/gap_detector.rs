//! Files backfill work for history nobody has covered.
//!
//! A pass does two things. First it recovers failed work: backfill ranges
//! stuck in processing for too long are failed, and every failed range gets
//! one pending re-filing that starts over from its last page cursor. A range
//! whose `retry_of` chain already holds `max_retries` re-filings is left
//! failed. Then it walks the live ranges in creation order and files the span
//! between every pair that does not meet, plus the span from the configured
//! anchor to the first live range.
//!
//! Filing is idempotent: a range with identical bounds is never filed twice.

use crate::config::Config;
use crate::db::{now_millis, sync_range};
use crate::models::{RangeSource, SyncRange};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Re-filings allowed per failed range before it is given up on.
pub const DEFAULT_MAX_RETRIES: i64 = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GapReport {
    /// Stuck ranges that were marked failed.
    pub stale_failed: u64,
    /// Ids of ranges filed to retry failed ones.
    pub retries: Vec<i64>,
    /// Ids of ranges filed to close continuity gaps.
    pub gaps: Vec<i64>,
}

impl GapReport {
    pub fn is_empty(&self) -> bool {
        self.stale_failed == 0 && self.retries.is_empty() && self.gaps.is_empty()
    }
}

pub struct GapDetector {
    db_pool: SqlitePool,
    start_tx: Option<String>,
    stale_after: Duration,
    max_retries: i64,
}

impl GapDetector {
    pub fn new(db_pool: SqlitePool, start_tx: Option<String>, stale_after: Duration) -> Self {
        Self {
            db_pool,
            start_tx,
            stale_after,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn from_config(db_pool: SqlitePool, config: &Config) -> Self {
        Self::new(db_pool, config.gap_start_tx.clone(), config.stale_range_after)
            .with_max_retries(config.max_range_retries)
    }

    pub async fn detect(&self) -> Result<GapReport, sqlx::Error> {
        debug!("Detecting gaps");
        let mut report = GapReport::default();

        self.recover_failed(&mut report).await?;

        for (start_tx, end_tx) in self.continuity_gaps().await? {
            if let Some(id) = self.file(&start_tx, &end_tx).await? {
                info!("Gap detected: {} -> {} filed as #{}", start_tx, end_tx, id);
                report.gaps.push(id);
            }
        }

        if report.is_empty() {
            info!("No gaps detected");
        }
        Ok(report)
    }

    /// Run a pass every `every` until cancelled.
    pub async fn run_every(&self, every: Duration, shutdown: CancellationToken) {
        info!("Starting gap detector, interval {:?}", every);

        loop {
            if let Err(e) = self.detect().await {
                error!("Gap detection failed: {}", e);
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(every) => {}
            }
        }

        info!("Shutting down gap detector");
    }

    async fn recover_failed(&self, report: &mut GapReport) -> Result<(), sqlx::Error> {
        let cutoff = now_millis() - self.stale_after.as_millis() as i64;
        report.stale_failed = sync_range::fail_stale(&self.db_pool, cutoff).await?;
        if report.stale_failed > 0 {
            info!("Marked {} stale sync range(s) as failed", report.stale_failed);
        }

        for (failed, retries) in sync_range::failed_without_retry(&self.db_pool).await? {
            if retries >= self.max_retries {
                warn!(
                    "Sync range #{} failed after {} re-filing(s), leaving it failed: {} -> {}",
                    failed.id, retries, failed.start_tx, failed.end_tx
                );
                continue;
            }
            let end_tx = failed.cursor_tx.as_deref().unwrap_or(&failed.end_tx);
            let id = sync_range::create_range(&self.db_pool, &failed.start_tx, end_tx, Some(failed.id))
                .await?;
            info!(
                "Re-filed failed range #{} as #{}: {} -> {}",
                failed.id, id, failed.start_tx, end_tx
            );
            report.retries.push(id);
        }

        Ok(())
    }

    /// Spans not covered by live ranges: anchor to the first one, then
    /// between each pair adjacent in creation order.
    async fn continuity_gaps(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        let live = sync_range::list_by_source(&self.db_pool, RangeSource::Realtime).await?;

        let mut gaps: Vec<(String, String)> = live
            .first()
            .and_then(|first| self.anchor_gap(first))
            .into_iter()
            .collect();
        for pair in live.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.end_tx != next.start_tx {
                gaps.push((prev.end_tx.clone(), next.start_tx.clone()));
            }
        }

        Ok(gaps)
    }

    fn anchor_gap(&self, range: &SyncRange) -> Option<(String, String)> {
        let anchor = self.start_tx.as_ref()?;
        if anchor == &range.start_tx {
            return None;
        }
        Some((anchor.clone(), range.start_tx.clone()))
    }

    async fn file(&self, start_tx: &str, end_tx: &str) -> Result<Option<i64>, sqlx::Error> {
        if sync_range::exists_with_bounds(&self.db_pool, start_tx, end_tx).await? {
            debug!("Gap {} -> {} already filed", start_tx, end_tx);
            return Ok(None);
        }
        sync_range::create_range(&self.db_pool, start_tx, end_tx, None)
            .await
            .map(Some)
    }
}
