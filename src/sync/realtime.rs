use crate::blockchain::processor::{ProcessOutcome, TransactionProcessor};
use crate::db::sync_range;
use crate::models::SyncStatus;
use crate::projector::TradeSource;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeReport {
    pub processed: usize,
    pub errors: usize,
}

/// Drains the signature queue one signature at a time and keeps a live
/// sync range covering everything it has handled.
pub struct RealtimeWorker {
    db_pool: SqlitePool,
    processor: TransactionProcessor,
    idle_interval: Duration,
    live_range: Option<i64>,
    report: RealtimeReport,
}

impl RealtimeWorker {
    pub fn new(db_pool: SqlitePool, processor: TransactionProcessor, idle_interval: Duration) -> Self {
        Self {
            db_pool,
            processor,
            idle_interval,
            live_range: None,
            report: RealtimeReport::default(),
        }
    }

    /// Consume `queue` until cancelled or until every sender is gone, then
    /// close the live range.
    pub async fn run(
        mut self,
        mut queue: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> RealtimeReport {
        info!("Starting realtime worker");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = timeout(self.idle_interval, queue.recv()) => next,
            };

            match next {
                Ok(Some(signature)) => self.handle(&signature).await,
                Ok(None) => {
                    info!("Signature queue closed");
                    break;
                }
                Err(_) => debug!("No new transactions to process"),
            }
        }

        self.close().await;
        info!(
            "Shutting down realtime worker: {} processed, {} errors",
            self.report.processed, self.report.errors
        );
        self.report
    }

    async fn handle(&mut self, signature: &str) {
        match self.processor.process(signature, TradeSource::Realtime).await {
            Ok(ProcessOutcome::Projected { .. }) => self.report.processed += 1,
            Ok(ProcessOutcome::Recorded { .. }) => self.report.errors += 1,
            Err(e) => {
                error!("Could not record failure of {}: {}", signature, e);
                self.report.errors += 1;
                return;
            }
        }

        if let Err(e) = self.advance(signature).await {
            error!("Database error in sync tracking for {}: {}", signature, e);
        }
    }

    async fn advance(&mut self, signature: &str) -> Result<(), sqlx::Error> {
        match self.live_range {
            Some(id) => sync_range::extend_live_range(&self.db_pool, id, signature).await,
            None => {
                let id = sync_range::create_live_range(&self.db_pool, signature).await?;
                info!("Opened live sync range #{} at {}", id, signature);
                self.live_range = Some(id);
                Ok(())
            }
        }
    }

    async fn close(&mut self) {
        let Some(id) = self.live_range.take() else {
            return;
        };
        match sync_range::finish(&self.db_pool, id, SyncStatus::Completed).await {
            Ok(_) => info!("Closed live sync range #{}", id),
            Err(e) => error!("Failed to close live sync range #{}: {}", id, e),
        }
    }
}
