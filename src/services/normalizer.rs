use crate::config::TrackerConfig;
use std::collections::{HashMap, HashSet};

/// Maps heterogeneous source chain labels onto the canonical tracked set.
/// Alias resolution is a plain table lookup; names without an alias pass
/// through unchanged. Tracked membership is the only chain filter anywhere.
pub struct ChainNormalizer {
    aliases: HashMap<String, String>,
    tracked: HashSet<String>,
}

impl ChainNormalizer {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            aliases: config.chain_aliases.clone(),
            tracked: config.tracked_chains.iter().cloned().collect(),
        }
    }

    pub fn normalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    /// Normalize and keep only tracked chains.
    pub fn canonical<'a>(&'a self, raw: &'a str) -> Option<&'a str> {
        let name = self.normalize(raw);
        self.is_tracked(name).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> ChainNormalizer {
        ChainNormalizer::new(&TrackerConfig::default())
    }

    #[test]
    fn aliases_map_to_canonical_names() {
        let n = normalizer();
        assert_eq!(n.normalize("Binance"), "BSC");
        assert_eq!(n.normalize("BNB Chain"), "BSC");
        assert_eq!(n.normalize("Hyperliquid L1"), "Hyperliquid");
    }

    #[test]
    fn unknown_names_pass_through() {
        let n = normalizer();
        assert_eq!(n.normalize("Ethereum"), "Ethereum");
        assert_eq!(n.normalize("Osmosis"), "Osmosis");
    }

    #[test]
    fn normalize_is_idempotent() {
        let n = normalizer();
        for raw in ["Binance", "BNB Chain", "Hyperliquid L1", "Ethereum", "Fantom"] {
            let once = n.normalize(raw).to_string();
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn canonical_drops_untracked_chains() {
        let n = normalizer();
        assert_eq!(n.canonical("Binance"), Some("BSC"));
        assert_eq!(n.canonical("Solana"), Some("Solana"));
        assert_eq!(n.canonical("Osmosis"), None);
    }
}
