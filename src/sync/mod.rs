pub mod backfill;
pub mod gap_detector;
pub mod realtime;

pub use backfill::BackfillWorker;
pub use gap_detector::GapDetector;
pub use realtime::RealtimeWorker;

use crate::blockchain::processor::TransactionProcessor;
use crate::blockchain::subscription::LogSubscription;
use crate::config::Config;
use realtime::RealtimeReport;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Wire the log subscription to a realtime worker through a bounded queue
/// and run both until `shutdown` fires.
pub async fn run_realtime(
    config: &Config,
    db_pool: SqlitePool,
    processor: TransactionProcessor,
    shutdown: CancellationToken,
) -> RealtimeReport {
    let (sender, receiver) = mpsc::channel(config.queue_capacity);

    let subscription = LogSubscription::from_config(config);
    let subscription_shutdown = shutdown.child_token();
    let stop_subscription = subscription_shutdown.clone();
    let subscription_handle = tokio::spawn(async move {
        subscription.run(sender, subscription_shutdown).await;
    });

    let worker = RealtimeWorker::new(db_pool, processor, config.idle_interval);
    let report = worker.run(receiver, shutdown).await;

    // The subscription must not outlive its consumer.
    stop_subscription.cancel();
    if let Err(e) = subscription_handle.await {
        warn!("Log subscription task ended abnormally: {}", e);
    }

    report
}
