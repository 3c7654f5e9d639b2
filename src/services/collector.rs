use super::{aggregator, ChainNormalizer, DropReason, PoolApportioner, QualityFilter};
use crate::config::TrackerConfig;
use crate::models::{ChainTvlRecord, PoolRecord, Snapshot, SupplyRecord};
use crate::sources::{DataFeeds, SourceError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fetches the three feeds, runs the reduction passes, and aggregates.
/// The fetches run concurrently and all three must succeed before a
/// snapshot is produced.
pub struct SnapshotCollector {
    feeds: Arc<dyn DataFeeds>,
    normalizer: ChainNormalizer,
    filter: QualityFilter,
    apportioner: PoolApportioner,
    target_symbols: HashSet<String>,
    tracked_chains: Vec<String>,
}

impl SnapshotCollector {
    pub fn new(feeds: Arc<dyn DataFeeds>, config: &TrackerConfig) -> Self {
        Self {
            feeds,
            normalizer: ChainNormalizer::new(config),
            filter: QualityFilter::new(config),
            apportioner: PoolApportioner::default(),
            target_symbols: config.stablecoins.iter().map(|s| s.to_uppercase()).collect(),
            tracked_chains: config.tracked_chains.clone(),
        }
    }

    pub async fn collect(&self) -> Result<Snapshot, SourceError> {
        let (pools, supplies, chain_tvls) = futures::try_join!(
            self.feeds.fetch_pools(),
            self.feeds.fetch_stablecoin_supplies(),
            self.feeds.fetch_chain_tvls(),
        )?;

        let stable_tvl = self.stable_tvl_by_chain(&pools);
        let supply = self.supply_by_chain(&supplies);
        let defi_tvl = self.defi_tvl_by_chain(&chain_tvls);

        Ok(aggregator::aggregate(
            &stable_tvl,
            &supply,
            &defi_tvl,
            &self.tracked_chains,
            Utc::now(),
        ))
    }

    /// Pool feed -> per-chain apportioned stable TVL.
    pub fn stable_tvl_by_chain(&self, pools: &[PoolRecord]) -> HashMap<String, f64> {
        let mut by_chain: HashMap<String, f64> = HashMap::new();
        let mut pool_counts: HashMap<String, u32> = HashMap::new();
        let mut excluded = 0u32;
        let mut outliers = 0u32;

        for pool in pools {
            let Some(chain) = self.normalizer.canonical(&pool.chain) else {
                continue;
            };

            match self.filter.check(pool) {
                Ok(()) => {}
                Err(DropReason::NonPositiveTvl) => continue,
                Err(DropReason::Denylisted) => {
                    excluded += 1;
                    continue;
                }
                Err(DropReason::Outlier) => {
                    tracing::info!(
                        "Skipping outlier: {} {} with ${:.2}B TVL",
                        chain,
                        pool.symbol,
                        pool.tvl_usd / 1e9
                    );
                    outliers += 1;
                    continue;
                }
            }

            let share = self
                .apportioner
                .apportion(&pool.symbol, pool.tvl_usd, pool.exposure);
            if share > 0.0 {
                *by_chain.entry(chain.to_string()).or_default() += share;
                *pool_counts.entry(chain.to_string()).or_default() += 1;
            }
        }

        tracing::debug!("Excluded {} known bad pools, {} outliers", excluded, outliers);
        for (chain, count) in &pool_counts {
            tracing::debug!(
                "{}: ${:.2}B from {} pools",
                chain,
                by_chain.get(chain).copied().unwrap_or(0.0) / 1e9,
                count
            );
        }

        by_chain
    }

    /// Supply feed -> per-chain circulating USD summed across target assets.
    pub fn supply_by_chain(&self, supplies: &[SupplyRecord]) -> HashMap<String, f64> {
        let mut by_chain: HashMap<String, f64> = HashMap::new();

        for asset in supplies {
            if !self.target_symbols.contains(&asset.symbol.to_uppercase()) {
                continue;
            }
            for (raw_chain, amount) in &asset.chain_circulating {
                if let Some(chain) = self.normalizer.canonical(raw_chain) {
                    *by_chain.entry(chain.to_string()).or_default() += amount;
                }
            }
        }

        by_chain
    }

    /// Chain-TVL feed -> per-chain total DeFi TVL.
    pub fn defi_tvl_by_chain(&self, chain_tvls: &[ChainTvlRecord]) -> HashMap<String, f64> {
        let mut by_chain: HashMap<String, f64> = HashMap::new();

        for record in chain_tvls {
            if let Some(chain) = self.normalizer.canonical(&record.name) {
                by_chain.insert(chain.to_string(), record.tvl);
            }
        }

        by_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exposure;
    use async_trait::async_trait;

    struct StubFeeds {
        pools: Vec<PoolRecord>,
        supplies: Vec<SupplyRecord>,
        chain_tvls: Vec<ChainTvlRecord>,
    }

    #[async_trait]
    impl DataFeeds for StubFeeds {
        async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, SourceError> {
            Ok(self.pools.clone())
        }

        async fn fetch_stablecoin_supplies(&self) -> Result<Vec<SupplyRecord>, SourceError> {
            Ok(self.supplies.clone())
        }

        async fn fetch_chain_tvls(&self) -> Result<Vec<ChainTvlRecord>, SourceError> {
            Ok(self.chain_tvls.clone())
        }
    }

    fn pool(chain: &str, id: &str, symbol: &str, tvl: f64, exposure: Exposure) -> PoolRecord {
        PoolRecord {
            chain: chain.to_string(),
            pool: id.to_string(),
            symbol: symbol.to_string(),
            tvl_usd: tvl,
            exposure,
        }
    }

    fn collector(feeds: StubFeeds) -> SnapshotCollector {
        SnapshotCollector::new(Arc::new(feeds), &TrackerConfig::default())
    }

    fn empty_collector() -> SnapshotCollector {
        collector(StubFeeds {
            pools: vec![],
            supplies: vec![],
            chain_tvls: vec![],
        })
    }

    #[test]
    fn pool_reduction_normalizes_filters_and_apportions() {
        let pools = vec![
            pool("Ethereum", "a", "USDC", 100.0, Exposure::Single),
            // Alias resolves to BSC.
            pool("Binance", "b", "USDT", 50.0, Exposure::Single),
            // Half attributable.
            pool("Ethereum", "c", "USDC-WETH", 80.0, Exposure::Multi),
            // Untracked chain.
            pool("Osmosis", "d", "USDC", 999.0, Exposure::Single),
            // Denylisted id.
            pool(
                "Ethereum",
                "5570b69e-8050-465b-8d09-ca0ef07da195",
                "USDC",
                777.0,
                Exposure::Single,
            ),
            // Outlier above the ceiling.
            pool("Ethereum", "e", "USDT", 6e9, Exposure::Single),
            // Zero TVL.
            pool("Ethereum", "f", "USDC", 0.0, Exposure::Single),
            // No stable component at all.
            pool("Ethereum", "g", "WETH-WBTC", 500.0, Exposure::Multi),
        ];

        let tvl = empty_collector().stable_tvl_by_chain(&pools);
        assert_eq!(tvl.get("Ethereum").copied().unwrap(), 140.0);
        assert_eq!(tvl.get("BSC").copied().unwrap(), 50.0);
        assert!(tvl.get("Osmosis").is_none());
    }

    #[test]
    fn supply_reduction_sums_target_assets_per_chain() {
        let c = empty_collector();

        let supplies = vec![
            SupplyRecord {
                symbol: "USDC".to_string(),
                chain_circulating: [("Ethereum".to_string(), 100.0), ("Binance".to_string(), 10.0)]
                    .into_iter()
                    .collect(),
            },
            SupplyRecord {
                symbol: "USDT".to_string(),
                chain_circulating: [("Ethereum".to_string(), 200.0)].into_iter().collect(),
            },
            // Not a target asset.
            SupplyRecord {
                symbol: "DAI".to_string(),
                chain_circulating: [("Ethereum".to_string(), 999.0)].into_iter().collect(),
            },
        ];

        let supply = c.supply_by_chain(&supplies);
        assert_eq!(supply.get("Ethereum").copied().unwrap(), 300.0);
        assert_eq!(supply.get("BSC").copied().unwrap(), 10.0);
    }

    #[test]
    fn chain_tvl_reduction_keeps_tracked_chains_only() {
        let c = empty_collector();

        let records = vec![
            ChainTvlRecord {
                name: "Ethereum".to_string(),
                tvl: 1000.0,
            },
            ChainTvlRecord {
                name: "Hyperliquid L1".to_string(),
                tvl: 50.0,
            },
            ChainTvlRecord {
                name: "Fantom".to_string(),
                tvl: 77.0,
            },
        ];

        let tvls = c.defi_tvl_by_chain(&records);
        assert_eq!(tvls.get("Ethereum").copied().unwrap(), 1000.0);
        assert_eq!(tvls.get("Hyperliquid").copied().unwrap(), 50.0);
        assert!(tvls.get("Fantom").is_none());
    }

    #[tokio::test]
    async fn collect_joins_all_three_feeds() {
        let c = collector(StubFeeds {
            pools: vec![pool("Ethereum", "a", "USDC", 100.0, Exposure::Single)],
            supplies: vec![SupplyRecord {
                symbol: "USDC".to_string(),
                chain_circulating: [("Ethereum".to_string(), 400.0)].into_iter().collect(),
            }],
            chain_tvls: vec![ChainTvlRecord {
                name: "Ethereum".to_string(),
                tvl: 1000.0,
            }],
        });

        let snapshot = c.collect().await.unwrap();
        let eth = snapshot.chains.iter().find(|r| r.chain == "Ethereum").unwrap();
        assert_eq!(eth.rank, 1);
        assert_eq!(eth.stable_tvl, 100.0);
        assert_eq!(eth.stable_supply, 400.0);
        assert_eq!(eth.defi_tvl, 1000.0);
        assert_eq!(eth.util_percent, 25.0);
        assert_eq!(eth.stbl_defi_percent, 10.0);
        // All twelve tracked chains are present even with sparse feeds.
        assert_eq!(snapshot.chains.len(), 12);
    }

    #[tokio::test]
    async fn collect_fails_when_any_feed_fails() {
        struct FailingFeeds;

        #[async_trait]
        impl DataFeeds for FailingFeeds {
            async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, SourceError> {
                Ok(vec![])
            }
            async fn fetch_stablecoin_supplies(&self) -> Result<Vec<SupplyRecord>, SourceError> {
                Err(SourceError::RateLimit)
            }
            async fn fetch_chain_tvls(&self) -> Result<Vec<ChainTvlRecord>, SourceError> {
                Ok(vec![])
            }
        }

        let c = SnapshotCollector::new(Arc::new(FailingFeeds), &TrackerConfig::default());
        assert!(c.collect().await.is_err());
    }
}
