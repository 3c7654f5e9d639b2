use crate::models::{ChainDelta, ChainRecord, Snapshot};

/// Week-over-week movement for one chain. No result when there is nothing
/// to compare against or the previous stable TVL is zero.
pub fn compare(current: &ChainRecord, previous: Option<&ChainRecord>) -> Option<ChainDelta> {
    let prev = previous?;
    if prev.stable_tvl == 0.0 {
        return None;
    }
    Some(ChainDelta {
        tvl_change_percent: (current.stable_tvl - prev.stable_tvl) / prev.stable_tvl * 100.0,
        util_change_points: current.util_percent - prev.util_percent,
    })
}

/// Pair every current record with its delta against the matching chain in
/// the previous snapshot, preserving the current ranking order.
pub fn snapshot_deltas<'a>(
    current: &'a Snapshot,
    previous: Option<&Snapshot>,
) -> Vec<(&'a ChainRecord, Option<ChainDelta>)> {
    current
        .chains
        .iter()
        .map(|record| {
            let prev = previous.and_then(|snap| {
                snap.chains.iter().find(|c| c.chain == record.chain)
            });
            (record, compare(record, prev))
        })
        .collect()
}

/// Delta for the snapshot totals, with the same zero-previous guard.
pub fn totals_tvl_change(current: &Snapshot, previous: Option<&Snapshot>) -> Option<f64> {
    let prev = previous?;
    if prev.totals.stable_tvl == 0.0 {
        return None;
    }
    Some(
        (current.totals.stable_tvl - prev.totals.stable_tvl) / prev.totals.stable_tvl * 100.0,
    )
}
