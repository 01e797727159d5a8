use crate::blockchain::client::{ClientError, LedgerRpc, SolanaClient};
use crate::blockchain::models::RawTransaction;
use crate::config::Config;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use solana_sdk::pubkey::Pubkey;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Round-robins calls over several RPC endpoints, optionally throttled to a
/// shared requests-per-second budget.
pub struct RpcPool {
    clients: Vec<Arc<dyn LedgerRpc>>,
    next: AtomicUsize,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RpcPool {
    pub fn new(
        clients: Vec<Arc<dyn LedgerRpc>>,
        rate_limit: Option<u32>,
    ) -> Result<Self, ClientError> {
        if clients.is_empty() {
            return Err(ClientError::NoEndpoints);
        }

        let limiter = rate_limit
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
            limiter,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let clients = config
            .solana_rpc_urls
            .iter()
            .map(|url| Arc::new(SolanaClient::new(url, config)) as Arc<dyn LedgerRpc>)
            .collect();

        info!(
            "RPC pool with {} endpoint(s), rate limit: {:?}",
            config.solana_rpc_urls.len(),
            config.rpc_rate_limit
        );
        Self::new(clients, config.rpc_rate_limit)
    }

    async fn next_client(&self) -> &Arc<dyn LedgerRpc> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }
}

#[async_trait]
impl LedgerRpc for RpcPool {
    async fn list_signatures(
        &self,
        program: &Pubkey,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ClientError> {
        self.next_client()
            .await
            .list_signatures(program, before, until, limit)
            .await
    }

    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<RawTransaction>, ClientError> {
        self.next_client().await.fetch_transaction(signature).await
    }
}
