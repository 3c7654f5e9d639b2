pub mod llama;
pub mod narrative;

use crate::models::{ChainTvlRecord, PoolRecord, SupplyRecord};
use async_trait::async_trait;

/// The three read-only upstream feeds the engine reconciles. One trait so
/// the collector can be driven by stub data in tests.
#[async_trait]
pub trait DataFeeds: Send + Sync {
    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, SourceError>;
    async fn fetch_stablecoin_supplies(&self) -> Result<Vec<SupplyRecord>, SourceError>;
    async fn fetch_chain_tvls(&self) -> Result<Vec<ChainTvlRecord>, SourceError>;
}

#[derive(Debug)]
pub enum SourceError {
    Network(String),
    Parse(String),
    RateLimit,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Network(e) => write!(f, "Network error: {}", e),
            SourceError::Parse(e) => write!(f, "Parse error: {}", e),
            SourceError::RateLimit => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for SourceError {}
