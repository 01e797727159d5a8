use crate::blockchain::client::{parse_commitment, ClientError};
use crate::config::Config;
use futures::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Streams signatures of transactions that mention the program into a
/// bounded queue, reconnecting whenever the websocket drops.
#[derive(Debug, Clone)]
pub struct LogSubscription {
    ws_url: String,
    program: Pubkey,
    commitment: CommitmentConfig,
    reconnect_delay: Duration,
}

enum StreamEnd {
    Shutdown,
    QueueClosed,
    Disconnected,
}

impl LogSubscription {
    pub fn new(ws_url: impl Into<String>, program: Pubkey, commitment: CommitmentConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            program,
            commitment,
            reconnect_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.solana_websocket_url.clone(),
            config.program_id,
            parse_commitment(&config.solana_commitment_level),
        )
    }

    /// Run until `shutdown` fires or the receiving side of `queue` is gone.
    pub async fn run(self, queue: mpsc::Sender<String>, shutdown: CancellationToken) {
        let mut delay = self.reconnect_delay;

        loop {
            match self.stream_once(&queue, &shutdown).await {
                Ok(StreamEnd::Shutdown) => {
                    info!("Log subscription cancelled");
                    return;
                }
                Ok(StreamEnd::QueueClosed) => {
                    warn!("Signature queue closed, stopping log subscription");
                    return;
                }
                Ok(StreamEnd::Disconnected) => {
                    warn!("Log stream for {} ended, re-subscribing", self.program);
                    delay = self.reconnect_delay;
                }
                Err(e) => {
                    error!("Log subscription to {} failed: {}", self.ws_url, e);
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = sleep(delay) => {}
            }
        }
    }

    async fn stream_once(
        &self,
        queue: &mpsc::Sender<String>,
        shutdown: &CancellationToken,
    ) -> Result<StreamEnd, ClientError> {
        let client = tokio::select! {
            _ = shutdown.cancelled() => return Ok(StreamEnd::Shutdown),
            client = PubsubClient::new(&self.ws_url) => client?,
        };

        let (mut stream, unsubscribe) = client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![self.program.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(self.commitment),
                },
            )
            .await?;
        info!("Subscribed to logs mentioning {}", self.program);

        let end = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break StreamEnd::Shutdown,
                next = stream.next() => {
                    let Some(response) = next else {
                        break StreamEnd::Disconnected;
                    };
                    debug!("Log notification for {}", response.value.signature);
                    // Blocks while the queue is full.
                    tokio::select! {
                        _ = shutdown.cancelled() => break StreamEnd::Shutdown,
                        sent = queue.send(response.value.signature) => {
                            if sent.is_err() {
                                break StreamEnd::QueueClosed;
                            }
                        }
                    }
                }
            }
        };

        drop(stream);
        unsubscribe().await;
        Ok(end)
    }
}
