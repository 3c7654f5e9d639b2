use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One tracked chain at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub rank: u32,
    pub chain: String,
    pub stable_tvl: f64,
    pub defi_tvl: f64,
    pub stable_supply: f64,
    pub util_percent: f64,
    pub stbl_defi_percent: f64,
}

impl ChainRecord {
    /// Build a record from the three raw metrics. Percent fields are derived
    /// here and nowhere else; rank starts at 0 until the aggregator sorts.
    pub fn new(chain: String, stable_tvl: f64, defi_tvl: f64, stable_supply: f64) -> Self {
        Self {
            rank: 0,
            chain,
            stable_tvl,
            defi_tvl,
            stable_supply,
            util_percent: ratio_percent(stable_tvl, stable_supply),
            stbl_defi_percent: ratio_percent(stable_tvl, defi_tvl),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTotals {
    pub stable_tvl: f64,
    pub defi_tvl: f64,
    pub stable_supply: f64,
    pub util_percent: f64,
    pub stbl_defi_percent: f64,
}

impl SnapshotTotals {
    /// Sum the base metrics across records and re-derive the percent fields
    /// from the sums. Averaging per-chain percentages would weight small and
    /// large chains equally, which is wrong.
    pub fn from_records(records: &[ChainRecord]) -> Self {
        let stable_tvl: f64 = records.iter().map(|r| r.stable_tvl).sum();
        let defi_tvl: f64 = records.iter().map(|r| r.defi_tvl).sum();
        let stable_supply: f64 = records.iter().map(|r| r.stable_supply).sum();
        Self {
            stable_tvl,
            defi_tvl,
            stable_supply,
            util_percent: ratio_percent(stable_tvl, stable_supply),
            stbl_defi_percent: ratio_percent(stable_tvl, defi_tvl),
        }
    }
}

/// Aggregated view of all tracked chains at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub chains: Vec<ChainRecord>,
    pub totals: SnapshotTotals,
}

impl Snapshot {
    /// Calendar-day key used for series deduplication.
    pub fn day_key(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// 100 * part / whole, or 0 when the denominator is not positive.
pub fn ratio_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// "$1.23B"-style compact USD formatting for tables and report text.
pub fn format_usd(value: f64) -> String {
    if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{:.1}%", value)
}
