use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    /// Background refresh cadence for the scheduler task.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// GET /refresh serves cached data when the latest snapshot is younger
    /// than this.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Bearer token required by the /cron/* routes. Unset = open (dev).
    #[serde(default)]
    pub cron_secret: Option<String>,
}

/// Tracked-chain and stablecoin tables. All lookup tables the engine uses
/// live here so test fixtures can construct their own.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Canonical chains, in expected-ranking order.
    #[serde(default = "default_tracked_chains")]
    pub tracked_chains: Vec<String>,
    /// Source label -> canonical name. Targets must not themselves be keys.
    #[serde(default = "default_chain_aliases")]
    pub chain_aliases: HashMap<String, String>,
    /// Target stablecoin tickers for the supply feed.
    #[serde(default = "default_stablecoins")]
    pub stablecoins: Vec<String>,
    /// Pool ids with known-corrupt data.
    #[serde(default = "default_excluded_pools")]
    pub excluded_pools: Vec<String>,
    /// Hard ceiling for a single pool's TVL; anything above is bad data.
    #[serde(default = "default_max_pool_tvl")]
    pub max_pool_tvl: f64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_interval_hours() -> u64 {
    24
}
fn default_freshness_secs() -> u64 {
    3600
}

fn default_tracked_chains() -> Vec<String> {
    [
        "Ethereum",
        "Base",
        "Solana",
        "Arbitrum",
        "Avalanche",
        "BSC",
        "Tron",
        "Hyperliquid",
        "Polygon",
        "Aptos",
        "Sui",
        "Plasma",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_chain_aliases() -> HashMap<String, String> {
    [
        ("Binance", "BSC"),
        ("BNB Chain", "BSC"),
        ("Hyperliquid L1", "Hyperliquid"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_stablecoins() -> Vec<String> {
    ["USDC", "USDT", "PYUSD"].iter().map(|s| s.to_string()).collect()
}

fn default_excluded_pools() -> Vec<String> {
    // USDC-USD pool reporting an impossible $20B TVL.
    vec!["5570b69e-8050-465b-8d09-ca0ef07da195".to_string()]
}

fn default_max_pool_tvl() -> f64 {
    5e9
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            freshness_secs: default_freshness_secs(),
            cron_secret: None,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracked_chains: default_tracked_chains(),
            chain_aliases: default_chain_aliases(),
            stablecoins: default_stablecoins(),
            excluded_pools: default_excluded_pools(),
            max_pool_tvl: default_max_pool_tvl(),
        }
    }
}

impl Config {
    /// Load config.toml from the working directory, falling back to the
    /// built-in defaults when the file is absent.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        match fs::read_to_string("config.toml") {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(_) => Ok(Config::default()),
        }
    }
}
