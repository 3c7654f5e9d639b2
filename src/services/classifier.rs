/// Bridge prefixes seen on USDC/USDT/PYUSD variants across chains.
const BRIDGE_PREFIXES: &[&str] = &["AXL", "WH", "MUL", "STAR", "LZ"];

/// One accepted symbol shape. Classification walks this table and nothing
/// else; there is deliberately no substring matching, which would accept
/// vault shares like VBUSDC or yvUSDC.
#[derive(Debug, Clone, Copy)]
pub enum SymbolRule {
    /// Ticker matches exactly (also used for synonym tickers).
    Exact(&'static str),
    /// Optional bridge prefix and optional ".e" suffix around the base.
    Bridged(&'static str),
    /// Base ticker with a dotted alphabetic chain suffix ("USDC.arb").
    ChainSuffixed(&'static str),
    /// Simple "W"-wrapped base ticker.
    Wrapped(&'static str),
}

impl SymbolRule {
    /// `symbol` is already uppercased by the classifier.
    fn matches(&self, symbol: &str) -> bool {
        match *self {
            SymbolRule::Exact(ticker) => symbol == ticker,
            SymbolRule::Bridged(base) => {
                for prefix in std::iter::once(&"").chain(BRIDGE_PREFIXES.iter()) {
                    if let Some(rest) = symbol.strip_prefix(prefix) {
                        let rest = rest.strip_suffix(".E").unwrap_or(rest);
                        if rest == base {
                            return true;
                        }
                    }
                }
                false
            }
            SymbolRule::ChainSuffixed(base) => match symbol
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('.'))
            {
                Some(suffix) => {
                    !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphabetic())
                }
                None => false,
            },
            SymbolRule::Wrapped(base) => symbol.strip_prefix('W') == Some(base),
        }
    }
}

/// Decides whether a ticker is a genuine target stablecoin, as opposed to a
/// yield-vault or leveraged wrapper that merely contains one.
pub struct StableClassifier {
    rules: Vec<SymbolRule>,
}

impl StableClassifier {
    pub fn new(rules: Vec<SymbolRule>) -> Self {
        Self { rules }
    }

    /// Accepted shapes for USDC, USDT and PYUSD plus their known synonym
    /// tickers (Stargate USDT0 / USD₮0).
    pub fn default_rules() -> Vec<SymbolRule> {
        vec![
            SymbolRule::Exact("USDC"),
            SymbolRule::Exact("USDT"),
            SymbolRule::Exact("PYUSD"),
            SymbolRule::Bridged("USDC"),
            SymbolRule::Bridged("USDT"),
            SymbolRule::Bridged("PYUSD"),
            SymbolRule::ChainSuffixed("USDC"),
            SymbolRule::ChainSuffixed("USDT"),
            SymbolRule::Exact("USDT0"),
            SymbolRule::Exact("USD₮0"),
            SymbolRule::Wrapped("USDC"),
            SymbolRule::Wrapped("USDT"),
        ]
    }

    pub fn is_target_stable(&self, symbol: &str) -> bool {
        let upper = symbol.trim().to_uppercase();
        self.rules.iter().any(|rule| rule.matches(&upper))
    }
}

impl Default for StableClassifier {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}
