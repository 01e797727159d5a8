//! Replays history for pending sync ranges.
//!
//! A claimed range `[start_tx, end_tx)` is walked page by page from `end_tx`
//! back towards `start_tx`; each page is processed oldest first. Progress is
//! recorded twice: `cursor_tx` when a page starts and `processed_tx` after
//! every signature, so a failed range can be re-filed without redoing the
//! pages it already finished.

use crate::blockchain::processor::{ProcessOutcome, TransactionProcessor};
use crate::config::Config;
use crate::db::sync_range;
use crate::error::{IndexerError, IndexerResult};
use crate::models::{SyncRange, SyncStatus};
use crate::projector::TradeSource;
use backon::Retryable;
use solana_sdk::pubkey::Pubkey;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RangeReport {
    pub pages: usize,
    pub processed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeEnd {
    Completed,
    Cancelled,
}

/// Result of one claimed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRun {
    pub range_id: i64,
    /// `Processing` when the run was cancelled part way.
    pub status: SyncStatus,
    pub report: RangeReport,
}

pub struct BackfillWorker {
    db_pool: SqlitePool,
    processor: TransactionProcessor,
    program: Pubkey,
    page_size: usize,
    idle_interval: Duration,
}

impl BackfillWorker {
    pub fn new(
        db_pool: SqlitePool,
        processor: TransactionProcessor,
        program: Pubkey,
        page_size: usize,
        idle_interval: Duration,
    ) -> Self {
        Self {
            db_pool,
            processor,
            program,
            page_size,
            idle_interval,
        }
    }

    pub fn from_config(db_pool: SqlitePool, processor: TransactionProcessor, config: &Config) -> Self {
        Self::new(
            db_pool,
            processor,
            config.program_id,
            config.backfill_page_size,
            config.idle_interval,
        )
    }

    /// Claim and process ranges until cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Starting backfill worker");

        while !shutdown.is_cancelled() {
            match self.run_once(&shutdown).await {
                Ok(Some(_)) => continue,
                Ok(None) => debug!("No pending sync range found"),
                Err(e) => error!("Backfill worker store error: {}", e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.idle_interval) => {}
            }
        }

        info!("Shutting down backfill worker");
    }

    /// Claim the oldest pending range and process it. `Ok(None)` when there
    /// was nothing to claim.
    pub async fn run_once(&self, shutdown: &CancellationToken) -> Result<Option<RangeRun>, sqlx::Error> {
        let Some(range) = sync_range::claim_next_pending(&self.db_pool).await? else {
            return Ok(None);
        };

        info!(
            "Processing sync range #{}: {} -> {}",
            range.id, range.start_tx, range.end_tx
        );

        let mut report = RangeReport::default();
        let status = match self.backfill_range(&range, &mut report, shutdown).await {
            Ok(RangeEnd::Completed) => {
                sync_range::finish(&self.db_pool, range.id, SyncStatus::Completed).await?;
                info!(
                    "Sync range #{} completed: {} processed, {} errors",
                    range.id, report.processed, report.errors
                );
                SyncStatus::Completed
            }
            Ok(RangeEnd::Cancelled) => {
                info!(
                    "Sync range #{} interrupted after {} processed, left in processing",
                    range.id, report.processed
                );
                SyncStatus::Processing
            }
            Err(e) => {
                error!("Error during backfill of range #{}: {}", range.id, e);
                sync_range::finish(&self.db_pool, range.id, SyncStatus::Failed).await?;
                SyncStatus::Failed
            }
        };

        Ok(Some(RangeRun {
            range_id: range.id,
            status,
            report,
        }))
    }

    async fn backfill_range(
        &self,
        range: &SyncRange,
        report: &mut RangeReport,
        shutdown: &CancellationToken,
    ) -> IndexerResult<RangeEnd> {
        if range.start_tx == range.end_tx {
            debug!("Sync range #{} is empty", range.id);
            return Ok(RangeEnd::Completed);
        }

        let mut before = range.cursor_tx.clone().unwrap_or_else(|| range.end_tx.clone());

        loop {
            if shutdown.is_cancelled() {
                return Ok(RangeEnd::Cancelled);
            }

            sync_range::set_cursor(&self.db_pool, range.id, &before).await?;
            let page = self.fetch_page(&before, &range.start_tx).await?;
            report.pages += 1;

            if page.is_empty() {
                debug!("No more signatures before {}", before);
                break;
            }
            debug!("Processing {} signatures before {}", page.len(), before);

            // Pages come newest first. Nodes that ignore `until` may return
            // the start signature and older ones; those belong to other ranges.
            let start = page.iter().position(|signature| signature == &range.start_tx);
            let in_range = &page[..start.unwrap_or(page.len())];

            for signature in in_range.iter().rev() {
                if shutdown.is_cancelled() {
                    return Ok(RangeEnd::Cancelled);
                }

                match self.processor.process(signature, TradeSource::Backfill).await? {
                    ProcessOutcome::Projected { .. } => report.processed += 1,
                    ProcessOutcome::Recorded { .. } => report.errors += 1,
                }
                sync_range::checkpoint(&self.db_pool, range.id, signature).await?;
            }

            if start.is_some() {
                debug!("Reached start of range #{}", range.id);
                break;
            }
            if page.len() < self.page_size {
                break;
            }
            match page.last() {
                Some(oldest) => before = oldest.clone(),
                None => break,
            }
        }

        Ok(RangeEnd::Completed)
    }

    async fn fetch_page(&self, before: &str, until: &str) -> IndexerResult<Vec<String>> {
        let rpc = self.processor.rpc();
        let list = || async {
            rpc.list_signatures(&self.program, Some(before), Some(until), self.page_size)
                .await
                .map_err(IndexerError::from)
        };

        list.retry(self.processor.backoff())
            .when(IndexerError::is_transient)
            .notify(|err: &IndexerError, delay: Duration| {
                warn!("Retrying signature page before {} in {:?}: {}", before, delay, err);
            })
            .await
    }
}
