pub mod client;
pub mod extractor;
pub mod models;
pub mod pool;
pub mod processor;
pub mod subscription;

// Re-exports for convenience
pub use client::{ClientError, LedgerRpc, SolanaClient};
pub use extractor::{EventExtractor, ExtractedEvent};
pub use pool::RpcPool;
pub use processor::{ProcessOutcome, TransactionProcessor};
