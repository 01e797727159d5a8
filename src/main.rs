use clap::{Parser, Subcommand};
use launchpad_indexer::{
    api,
    blockchain::{LedgerRpc, RpcPool, TransactionProcessor},
    cache,
    config::Config,
    db,
    state::AppState,
    sync::{self, BackfillWorker, GapDetector},
};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "launchpad-indexer", about = "Indexes LaunchLab pools, trades and klines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process pending sync ranges
    Backfill,
    /// Follow program logs as they land
    Realtime,
    /// File backfill ranges for uncovered history
    GapDetect {
        /// Repeat every N seconds instead of running once
        #[arg(long)]
        every: Option<u64>,
    },
    /// Print the events of one transaction without storing anything
    Debug { signature: String },
    /// Run backfill, realtime and gap detection together
    Run {
        /// Gap detection interval in seconds
        #[arg(long, default_value_t = 60)]
        gap_every: u64,
    },
    /// Serve the query API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            ctrl_c.cancel();
        }
    });

    match run(cli.command, config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    info!("Database connection established");

    match command {
        Command::Serve => return serve(config, db_pool, shutdown).await,
        Command::GapDetect { every } => {
            let detector = GapDetector::from_config(db_pool, &config);
            match every {
                Some(secs) => detector.run_every(Duration::from_secs(secs), shutdown).await,
                None => {
                    let report = detector.detect().await?;
                    info!(
                        "Gap detection done: {} stale, {} retries, {} gaps",
                        report.stale_failed,
                        report.retries.len(),
                        report.gaps.len()
                    );
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let rpc: Arc<dyn LedgerRpc> = Arc::new(RpcPool::from_config(&config)?);
    let processor = TransactionProcessor::from_config(rpc, db_pool.clone(), &config);

    match command {
        Command::Backfill => {
            BackfillWorker::from_config(db_pool, processor, &config)
                .run(shutdown)
                .await;
        }
        Command::Realtime => {
            sync::run_realtime(&config, db_pool, processor, shutdown).await;
        }
        Command::Debug { signature } => {
            let events = processor.fetch_events(&signature).await?;
            println!("{} event(s) in {}", events.len(), signature);
            for event in &events {
                println!("{:#?}", event);
            }
        }
        Command::Run { gap_every } => {
            let backfill = BackfillWorker::from_config(db_pool.clone(), processor.clone(), &config);
            let backfill_shutdown = shutdown.clone();
            let backfill_handle = tokio::spawn(async move { backfill.run(backfill_shutdown).await });

            let detector = GapDetector::from_config(db_pool.clone(), &config);
            let gap_shutdown = shutdown.clone();
            let gap_handle = tokio::spawn(async move {
                detector.run_every(Duration::from_secs(gap_every), gap_shutdown).await
            });

            sync::run_realtime(&config, db_pool, processor, shutdown).await;

            for handle in [backfill_handle, gap_handle] {
                if let Err(e) = handle.await {
                    error!("Worker task ended abnormally: {}", e);
                }
            }
        }
        Command::Serve | Command::GapDetect { .. } => {}
    }

    Ok(())
}

async fn serve(
    config: Config,
    db_pool: sqlx::SqlitePool,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let cache = cache::init_cache(&config);
    info!(
        "Cache initialized with TTL: {:?} and capacity: {}",
        config.cache_ttl, config.cache_max_capacity
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let app_state = Arc::new(AppState {
        config,
        db_pool,
        cache,
    });
    let app = api::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
