use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weekly narrative produced by the analysis collaborator. At most three
/// bullets; persisted in its own capped series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAnalysis {
    pub timestamp: DateTime<Utc>,
    pub bullets: Vec<String>,
}

/// Week-over-week movement for one chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDelta {
    /// Relative change of stable TVL, in percent.
    pub tvl_change_percent: f64,
    /// Utilization movement in percentage points, not relative percent.
    pub util_change_points: f64,
}
