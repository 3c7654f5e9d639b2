use super::StableClassifier;
use crate::models::Exposure;

/// Computes the slice of a pool's TVL attributable to target stablecoins.
pub struct PoolApportioner {
    classifier: StableClassifier,
}

/// Split a pool symbol into component tickers. Hyphen, slash and underscore
/// all delimit; pure-numeric tokens are fee-tier markers, not assets.
pub fn components(symbol: &str) -> Vec<&str> {
    symbol
        .split(['-', '/', '_'])
        .map(str::trim)
        .filter(|part| !part.is_empty() && !part.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

impl PoolApportioner {
    pub fn new(classifier: StableClassifier) -> Self {
        Self { classifier }
    }

    /// Single-exposure pools count all-or-nothing. Multi-asset pools split
    /// linearly by component count: the feed exposes no per-asset reserve
    /// values, so equal weighting is the working assumption.
    pub fn apportion(&self, symbol: &str, pool_tvl: f64, exposure: Exposure) -> f64 {
        let parts = components(symbol);
        if parts.is_empty() {
            return 0.0;
        }

        let valid = parts
            .iter()
            .filter(|part| self.classifier.is_target_stable(part))
            .count();
        if valid == 0 {
            return 0.0;
        }

        if exposure == Exposure::Single || parts.len() == 1 {
            return if self.classifier.is_target_stable(parts[0]) {
                pool_tvl
            } else {
                0.0
            };
        }

        pool_tvl * valid as f64 / parts.len() as f64
    }
}

impl Default for PoolApportioner {
    fn default() -> Self {
        Self::new(StableClassifier::default())
    }
}
