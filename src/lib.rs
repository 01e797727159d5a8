pub mod api;
pub mod blockchain;
pub mod cache;
pub mod config;
pub mod db;
pub mod decoder;
pub mod error;
pub mod models;
pub mod projector;
pub mod state;
pub mod sync;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience if desired
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::create_router;
pub use config::Config;
pub use error::IndexerError;
pub use validation::validate_solana_address;
