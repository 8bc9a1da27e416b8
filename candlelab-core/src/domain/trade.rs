use crate::domain::market::{PositionSide, Symbol, TradeAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of one executed trade event.
///
/// `pnl` is the PnL realized by this event (0 for opens; fees folded in for
/// closes). `margin_used` is the margin committed by the event, 0 for closes
/// and liquidations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub action: TradeAction,
    pub quantity: f64,
    pub price: f64,
    pub leverage: f64,
    pub fee: f64,
    pub side: PositionSide,
    pub pnl: f64,
    pub margin_used: f64,
}

impl Trade {
    pub fn notional_value(&self) -> f64 {
        self.quantity.abs() * self.price
    }

    /// True when this event closed exposure (realized PnL is meaningful).
    pub fn is_closing(&self) -> bool {
        self.margin_used == 0.0
    }
}
