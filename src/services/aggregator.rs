use crate::models::{ChainRecord, Snapshot, SnapshotTotals};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Reconcile the three per-chain feeds into one ranked snapshot.
///
/// Every tracked chain appears in the output; chains absent from a feed get
/// zero for that metric rather than being dropped. There are no error paths:
/// every lookup defaults to zero.
pub fn aggregate(
    stable_tvl: &HashMap<String, f64>,
    supply: &HashMap<String, f64>,
    defi_tvl: &HashMap<String, f64>,
    tracked_chains: &[String],
    timestamp: DateTime<Utc>,
) -> Snapshot {
    let mut chains: Vec<ChainRecord> = tracked_chains
        .iter()
        .map(|chain| {
            ChainRecord::new(
                chain.clone(),
                stable_tvl.get(chain).copied().unwrap_or(0.0),
                defi_tvl.get(chain).copied().unwrap_or(0.0),
                supply.get(chain).copied().unwrap_or(0.0),
            )
        })
        .collect();

    // Stable sort: ties keep the configured chain order.
    chains.sort_by(|a, b| b.stable_tvl.total_cmp(&a.stable_tvl));
    for (index, record) in chains.iter_mut().enumerate() {
        record.rank = index as u32 + 1;
    }

    let totals = SnapshotTotals::from_records(&chains);
    Snapshot {
        timestamp,
        chains,
        totals,
    }
}
