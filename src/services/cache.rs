use crate::models::Snapshot;
use parking_lot::RwLock;
use std::sync::Arc;

/// In-memory copy of the most recent snapshot so the read endpoints do not
/// hit the backend on every request. Zero-copy handout via Arc.
#[derive(Default)]
pub struct SnapshotCache {
    latest: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().clone()
    }

    pub fn set(&self, snapshot: Snapshot) {
        *self.latest.write() = Some(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainRecord, SnapshotTotals};
    use chrono::Utc;

    #[test]
    fn starts_empty_and_holds_the_latest_value() {
        let cache = SnapshotCache::new();
        assert!(cache.get().is_none());

        let chains = vec![ChainRecord::new("Tron".to_string(), 5.0, 0.0, 0.0)];
        let totals = SnapshotTotals::from_records(&chains);
        cache.set(Snapshot {
            timestamp: Utc::now(),
            chains,
            totals,
        });

        let held = cache.get().unwrap();
        assert_eq!(held.chains[0].chain, "Tron");
    }
}
