pub mod analysis;
pub mod chain;
pub mod feed;

pub use analysis::{ChainDelta, WeeklyAnalysis};
pub use chain::{ChainRecord, Snapshot, SnapshotTotals};
pub use feed::{ChainTvlRecord, Exposure, PoolRecord, SupplyRecord};
