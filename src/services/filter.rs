use crate::config::TrackerConfig;
use crate::models::PoolRecord;
use std::collections::HashSet;

/// Why a pool record was dropped before apportionment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NonPositiveTvl,
    Denylisted,
    Outlier,
}

/// Removes known-bad records and outliers before they pollute aggregates.
/// Denylist plus hard ceiling instead of statistical detection: upstream
/// misreports are rare, huge, and easier to audit one id at a time.
pub struct QualityFilter {
    excluded_pools: HashSet<String>,
    max_pool_tvl: f64,
}

impl QualityFilter {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            excluded_pools: config.excluded_pools.iter().cloned().collect(),
            max_pool_tvl: config.max_pool_tvl,
        }
    }

    /// Ok for usable records; Err carries the drop reason so the caller can
    /// count exclusions and outliers.
    pub fn check(&self, pool: &PoolRecord) -> Result<(), DropReason> {
        if pool.tvl_usd <= 0.0 {
            return Err(DropReason::NonPositiveTvl);
        }
        if self.excluded_pools.contains(&pool.pool) {
            return Err(DropReason::Denylisted);
        }
        if pool.tvl_usd > self.max_pool_tvl {
            return Err(DropReason::Outlier);
        }
        Ok(())
    }
}
