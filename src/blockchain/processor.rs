use crate::blockchain::client::LedgerRpc;
use crate::blockchain::extractor::{EventExtractor, ExtractedEvent};
use crate::config::Config;
use crate::db::error_log;
use crate::error::{IndexerError, IndexerResult};
use crate::projector::{Projector, TradeSource};
use backon::{ExponentialBuilder, Retryable};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// What happened to one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Projected { events: usize },
    /// The failure was recorded in the error log; the caller moves on.
    Recorded { error: String },
}

/// Fetch, extract and project a single signature, with retries on the
/// fetch and an error record when it cannot be done.
#[derive(Clone)]
pub struct TransactionProcessor {
    rpc: Arc<dyn LedgerRpc>,
    extractor: EventExtractor,
    projector: Projector,
    db_pool: SqlitePool,
    backoff: ExponentialBuilder,
}

impl TransactionProcessor {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        extractor: EventExtractor,
        db_pool: SqlitePool,
        retry_attempts: usize,
        retry_min_delay: Duration,
    ) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(retry_min_delay)
            .with_max_delay(retry_min_delay.saturating_mul(8))
            .with_max_times(retry_attempts.saturating_sub(1));

        Self {
            rpc,
            extractor,
            projector: Projector::new(db_pool.clone()),
            db_pool,
            backoff,
        }
    }

    pub fn from_config(rpc: Arc<dyn LedgerRpc>, db_pool: SqlitePool, config: &Config) -> Self {
        let extractor =
            EventExtractor::new(config.program_id.to_string(), config.platform_config.clone());
        Self::new(
            rpc,
            extractor,
            db_pool,
            config.retry_attempts,
            config.retry_min_delay,
        )
    }

    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Retry policy shared with callers that make their own RPC calls.
    pub fn backoff(&self) -> ExponentialBuilder {
        self.backoff.clone()
    }

    /// Fetch a transaction and extract its events, retrying transient
    /// failures including "not found yet".
    pub async fn fetch_events(&self, signature: &str) -> IndexerResult<Vec<ExtractedEvent>> {
        let fetch = || async {
            match self.rpc.fetch_transaction(signature).await? {
                Some(tx) => Ok(self.extractor.extract(&tx)),
                None => Err(IndexerError::TransactionNotFound(signature.to_string())),
            }
        };

        fetch
            .retry(self.backoff.clone())
            .when(IndexerError::is_transient)
            .notify(|err: &IndexerError, delay: Duration| {
                warn!("Retrying {} in {:?}: {}", signature, delay, err);
            })
            .await
    }

    /// Process one signature. Failures to fetch or project become an error
    /// record; only a failure to write that record is returned as `Err`.
    pub async fn process(&self, signature: &str, source: TradeSource) -> IndexerResult<ProcessOutcome> {
        let result = match self.fetch_events(signature).await {
            Ok(events) => self
                .projector
                .apply(&events, source)
                .await
                .map(|_| events.len()),
            Err(e) => Err(e),
        };

        match result {
            Ok(events) => {
                debug!("Processed {} with {} event(s)", signature, events);
                Ok(ProcessOutcome::Projected { events })
            }
            Err(e) => {
                let message = e.to_string();
                error!("Failed to process transaction {}: {}", signature, message);
                error_log::record_error(&self.db_pool, signature, &message).await?;
                Ok(ProcessOutcome::Recorded { error: message })
            }
        }
    }
}
