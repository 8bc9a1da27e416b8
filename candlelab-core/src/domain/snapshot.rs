use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-bar record of portfolio state, the unit of the history time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub margin_used: f64,
    pub position_count: usize,
    /// Spot: 0. Futures: used margin over initial capital.
    pub leverage_ratio: f64,
}
