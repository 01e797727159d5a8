use crate::blockchain::client::ClientError;
use thiserror::Error;

/// Failure while turning one signature into persisted state.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] ClientError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Projection error: {0}")]
    Projection(String),
}

impl IndexerError {
    /// Errors worth another attempt: RPC hiccups and transactions the node
    /// has not caught up with yet. Malformed input never heals.
    pub fn is_transient(&self) -> bool {
        match self {
            IndexerError::Rpc(err) => err.is_transient(),
            IndexerError::TransactionNotFound(_) => true,
            IndexerError::Database(_) | IndexerError::Projection(_) => false,
        }
    }
}

pub type IndexerResult<T> = Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_transient() {
        assert!(IndexerError::TransactionNotFound("sig".into()).is_transient());
    }

    #[test]
    fn bad_input_is_permanent() {
        assert!(!IndexerError::Rpc(ClientError::SignatureError("bad".into())).is_transient());
        assert!(!IndexerError::Projection("missing account".into()).is_transient());
        assert!(!IndexerError::Database(sqlx::Error::RowNotFound).is_transient());
    }
}
