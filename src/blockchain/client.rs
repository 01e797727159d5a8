use crate::blockchain::models::{extract_transaction, RawTransaction};
use crate::config::Config;
use async_trait::async_trait;
use solana_client::client_error::ClientErrorKind;
use solana_client::nonblocking::pubsub_client::PubsubClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    RpcError(#[from] solana_client::client_error::ClientError),

    #[error("Subscription error: {0}")]
    PubsubError(#[from] PubsubClientError),

    #[error("Invalid signature: {0}")]
    SignatureError(String),

    #[error("No RPC endpoints configured")]
    NoEndpoints,
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::RpcError(_) | ClientError::PubsubError(_))
    }
}

/// The two ledger reads the indexer needs.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Signatures mentioning `program`, newest first, strictly older than
    /// `before` and strictly newer than `until`.
    async fn list_signatures(
        &self,
        program: &Pubkey,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ClientError>;

    /// `Ok(None)` when the node does not (yet) know the transaction.
    async fn fetch_transaction(&self, signature: &str)
        -> Result<Option<RawTransaction>, ClientError>;
}

pub fn parse_commitment(level: &str) -> CommitmentConfig {
    match level {
        "processed" => CommitmentConfig::processed(),
        "confirmed" => CommitmentConfig::confirmed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

fn parse_signature(signature: &str) -> Result<Signature, ClientError> {
    Signature::from_str(signature).map_err(|_| ClientError::SignatureError(signature.to_string()))
}

/// `getTransaction` answers `null` for signatures the node has not seen, and
/// the client only surfaces that as a failure to deserialize the result.
fn is_missing_transaction(err: &solana_client::client_error::ClientError) -> bool {
    matches!(err.kind(), ClientErrorKind::SerdeJson(_))
        && err.to_string().contains("invalid type: null")
}

/// A single JSON-RPC endpoint.
pub struct SolanaClient {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    pub fn new(rpc_url: &str, config: &Config) -> Self {
        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let commitment = parse_commitment(&config.solana_commitment_level);

        info!(
            "Initializing Solana client with RPC endpoint: {}, commitment: {:?}",
            rpc_url, commitment
        );

        let rpc_client =
            RpcClient::new_with_timeout_and_commitment(rpc_url.to_string(), timeout, commitment);

        Self {
            rpc_client,
            commitment,
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaClient {
    async fn list_signatures(
        &self,
        program: &Pubkey,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ClientError> {
        let before = before.map(parse_signature).transpose()?;
        let until = until.map(parse_signature).transpose()?;

        let statuses = self
            .rpc_client
            .get_signatures_for_address_with_config(
                program,
                GetConfirmedSignaturesForAddress2Config {
                    before,
                    until,
                    limit: Some(limit),
                    commitment: Some(self.commitment),
                },
            )
            .await?;

        debug!("Fetched {} signatures for {}", statuses.len(), program);
        Ok(statuses.into_iter().map(|status| status.signature).collect())
    }

    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<RawTransaction>, ClientError> {
        let parsed = parse_signature(signature)?;

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        match self.rpc_client.get_transaction_with_config(&parsed, config).await {
            Ok(tx) => Ok(extract_transaction(signature, &tx)),
            Err(e) if is_missing_transaction(&e) => {
                debug!("Transaction {} not available yet", signature);
                Ok(None)
            }
            Err(e) => Err(ClientError::RpcError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_commitment_falls_back_to_confirmed() {
        assert_eq!(parse_commitment("bogus"), CommitmentConfig::confirmed());
        assert_eq!(parse_commitment("finalized"), CommitmentConfig::finalized());
    }

    #[test]
    fn null_transaction_result_reads_as_missing() {
        let null = serde_json::from_value::<
            solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta,
        >(serde_json::Value::Null)
        .unwrap_err();
        let err = solana_client::client_error::ClientError::from(ClientErrorKind::SerdeJson(null));
        assert!(is_missing_transaction(&err));

        let custom = solana_client::client_error::ClientError::from(ClientErrorKind::Custom(
            "invalid type: null".to_string(),
        ));
        assert!(!is_missing_transaction(&custom));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert!(matches!(
            parse_signature("not-a-signature"),
            Err(ClientError::SignatureError(_))
        ));
    }
}
