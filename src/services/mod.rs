pub mod aggregator;
pub mod apportion;
pub mod cache;
pub mod classifier;
pub mod collector;
pub mod comparator;
pub mod filter;
pub mod normalizer;
pub mod storage;
pub mod store;

pub use apportion::PoolApportioner;
pub use cache::SnapshotCache;
pub use classifier::{StableClassifier, SymbolRule};
pub use collector::SnapshotCollector;
pub use filter::{DropReason, QualityFilter};
pub use normalizer::ChainNormalizer;
pub use storage::LocalStorage;
pub use store::{SeriesBackend, SnapshotStore, StorageError};
