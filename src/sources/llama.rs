use super::{DataFeeds, SourceError};
use crate::models::{ChainTvlRecord, Exposure, PoolRecord, SupplyRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const API_BASE: &str = "https://api.llama.fi";
const STABLECOINS_BASE: &str = "https://stablecoins.llama.fi";
const YIELDS_BASE: &str = "https://yields.llama.fi";

/// DeFi Llama clients for the three feeds. Fields the upstream omits or
/// garbles deserialize to their defaults; bad records are the reducers'
/// problem, not a fetch failure.
pub struct LlamaFeeds {
    client: Client,
    api_base: String,
    stablecoins_base: String,
    yields_base: String,
}

#[derive(Debug, Deserialize)]
struct YieldsResponse {
    #[serde(default)]
    data: Vec<YieldPool>,
}

#[derive(Debug, Deserialize)]
struct YieldPool {
    #[serde(default)]
    chain: String,
    #[serde(default)]
    pool: String,
    #[serde(default)]
    symbol: String,
    #[serde(rename = "tvlUsd", default)]
    tvl_usd: f64,
    #[serde(default)]
    exposure: Exposure,
}

#[derive(Debug, Deserialize)]
struct PeggedResponse {
    #[serde(rename = "peggedAssets", default)]
    pegged_assets: Vec<PeggedAsset>,
}

#[derive(Debug, Deserialize)]
struct PeggedAsset {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "chainCirculating", default)]
    chain_circulating: HashMap<String, ChainCirculating>,
}

#[derive(Debug, Default, Deserialize)]
struct ChainCirculating {
    #[serde(default)]
    current: PeggedAmount,
}

#[derive(Debug, Default, Deserialize)]
struct PeggedAmount {
    #[serde(rename = "peggedUSD", default)]
    pegged_usd: f64,
}

#[derive(Debug, Deserialize)]
struct ChainEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tvl: f64,
}

impl LlamaFeeds {
    pub fn new() -> Self {
        Self::with_bases(API_BASE, STABLECOINS_BASE, YIELDS_BASE)
    }

    pub fn with_bases(api: &str, stablecoins: &str, yields: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap(),
            api_base: api.to_string(),
            stablecoins_base: stablecoins.to_string(),
            yields_base: yields.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if resp.status() == 429 {
            return Err(SourceError::RateLimit);
        }
        if !resp.status().is_success() {
            return Err(SourceError::Network(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }

        resp.json().await.map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl Default for LlamaFeeds {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataFeeds for LlamaFeeds {
    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, SourceError> {
        let url = format!("{}/pools", self.yields_base);
        let body: YieldsResponse = self.get_json(&url).await?;
        tracing::debug!("Yields feed: {} pools", body.data.len());

        Ok(body
            .data
            .into_iter()
            .map(|p| PoolRecord {
                chain: p.chain,
                pool: p.pool,
                symbol: p.symbol,
                tvl_usd: p.tvl_usd,
                exposure: p.exposure,
            })
            .collect())
    }

    async fn fetch_stablecoin_supplies(&self) -> Result<Vec<SupplyRecord>, SourceError> {
        let url = format!("{}/stablecoins?includePrices=false", self.stablecoins_base);
        let body: PeggedResponse = self.get_json(&url).await?;
        tracing::debug!("Stablecoins feed: {} pegged assets", body.pegged_assets.len());

        Ok(body
            .pegged_assets
            .into_iter()
            .map(|asset| SupplyRecord {
                symbol: asset.symbol,
                chain_circulating: asset
                    .chain_circulating
                    .into_iter()
                    .map(|(chain, c)| (chain, c.current.pegged_usd))
                    .collect(),
            })
            .collect())
    }

    async fn fetch_chain_tvls(&self) -> Result<Vec<ChainTvlRecord>, SourceError> {
        // The /chains numbers include double counting and liquid staking,
        // so they run higher than the DeFi Llama homepage.
        let url = format!("{}/chains", self.api_base);
        let body: Vec<ChainEntry> = self.get_json(&url).await?;
        tracing::debug!("Chains feed: {} chains", body.len());

        Ok(body
            .into_iter()
            .map(|c| ChainTvlRecord {
                name: c.name,
                tvl: c.tvl,
            })
            .collect())
    }
}
