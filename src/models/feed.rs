use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a pool holds a single asset or a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    Single,
    #[serde(other)]
    Multi,
}

impl Default for Exposure {
    fn default() -> Self {
        Exposure::Single
    }
}

/// One liquidity pool as reported by the yields feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRecord {
    pub chain: String,
    pub pool: String,
    pub symbol: String,
    pub tvl_usd: f64,
    pub exposure: Exposure,
}

/// One pegged asset with its per-chain circulating USD value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub symbol: String,
    pub chain_circulating: HashMap<String, f64>,
}

/// Total DeFi TVL for one chain as reported by the chains feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTvlRecord {
    pub name: String,
    pub tvl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_exposure_reads_as_multi() {
        let e: Exposure = serde_json::from_str("\"single\"").unwrap();
        assert_eq!(e, Exposure::Single);
        let e: Exposure = serde_json::from_str("\"multi\"").unwrap();
        assert_eq!(e, Exposure::Multi);
        let e: Exposure = serde_json::from_str("\"weighted\"").unwrap();
        assert_eq!(e, Exposure::Multi);
    }
}
