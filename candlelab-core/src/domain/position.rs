//! Position: a single open exposure with margin and leverage arithmetic.

use crate::domain::market::{PositionSide, Symbol, TradeAction, TradingMode};
use crate::domain::trade::Trade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("short positions are not allowed in spot mode")]
    ShortInSpot,

    #[error("cannot build a position from a liquidation trade")]
    FromLiquidation,
}

/// An open exposure in a single symbol.
///
/// `size` is signed: positive for long, negative for short. `margin_used` is
/// the cash reserved against the position: the full notional in spot mode,
/// `notional / leverage` in futures mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub size: f64,
    pub entry_price: f64,
    pub leverage: f64,
    pub opened_at: DateTime<Utc>,
    pub side: PositionSide,
    pub margin_used: f64,
}

impl Position {
    /// Open a long position; `size` is taken as an absolute quantity.
    pub fn open_long(
        symbol: Symbol,
        size: f64,
        entry_price: f64,
        leverage: f64,
        opened_at: DateTime<Utc>,
        mode: TradingMode,
    ) -> Result<Self, PositionError> {
        validate_positive("size", size)?;
        validate_positive("entry_price", entry_price)?;
        validate_positive("leverage", leverage)?;

        let size = size.abs();
        Ok(Self {
            symbol,
            size,
            entry_price,
            leverage,
            opened_at,
            side: PositionSide::Long,
            margin_used: margin_for(size, entry_price, leverage, mode),
        })
    }

    /// Open a short position; fails in spot mode.
    pub fn open_short(
        symbol: Symbol,
        size: f64,
        entry_price: f64,
        leverage: f64,
        opened_at: DateTime<Utc>,
        mode: TradingMode,
    ) -> Result<Self, PositionError> {
        if !mode.allows_short() {
            return Err(PositionError::ShortInSpot);
        }
        validate_positive("size", size)?;
        validate_positive("entry_price", entry_price)?;
        validate_positive("leverage", leverage)?;

        let size = size.abs();
        Ok(Self {
            symbol,
            size: -size,
            entry_price,
            leverage,
            opened_at,
            side: PositionSide::Short,
            margin_used: margin_for(size, entry_price, leverage, mode),
        })
    }

    /// Build the position a trade would open: Buy opens a long, Sell a short.
    pub fn from_trade(trade: &Trade, mode: TradingMode) -> Result<Self, PositionError> {
        match trade.action {
            TradeAction::Buy => Self::open_long(
                trade.symbol,
                trade.quantity,
                trade.price,
                trade.leverage,
                trade.timestamp,
                mode,
            ),
            TradeAction::Sell => Self::open_short(
                trade.symbol,
                trade.quantity,
                trade.price,
                trade.leverage,
                trade.timestamp,
                mode,
            ),
            TradeAction::Liquidation => Err(PositionError::FromLiquidation),
        }
    }

    /// Mark-to-market profit: long gains as price rises, short as it falls.
    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (mark_price - self.entry_price) * self.size.abs(),
            PositionSide::Short => (self.entry_price - mark_price) * self.size.abs(),
        }
    }

    /// True when losses have eaten through the margin down to the
    /// maintenance buffer: `upnl <= -(margin_used * (1 - maintenance_rate))`.
    ///
    /// The risk engine never scans spot portfolios, so the predicate assumes
    /// margined exposure.
    pub fn is_liquidation_risk(&self, mark_price: f64, maintenance_rate: f64) -> bool {
        if self.size.abs() == 0.0 {
            return false;
        }
        self.unrealized_pnl(mark_price) <= -(self.margin_used * (1.0 - maintenance_rate))
    }

    /// Spot valuation of the exposure at a mark price.
    pub fn position_value(&self, mark_price: f64) -> f64 {
        self.size.abs() * mark_price
    }

    /// Exposure at the entry price.
    pub fn notional(&self) -> f64 {
        self.size.abs() * self.entry_price
    }
}

/// Margin reserved for an exposure under the given mode.
pub(crate) fn margin_for(size: f64, price: f64, leverage: f64, mode: TradingMode) -> f64 {
    let notional = size.abs() * price;
    match mode {
        TradingMode::Spot => notional,
        TradingMode::Futures => notional / leverage,
    }
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), PositionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PositionError::NonPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn long_pnl_follows_price_up() {
        let pos = Position::open_long(
            Symbol::BtcUsdt,
            2.0,
            100.0,
            1.0,
            ts(),
            TradingMode::Spot,
        )
        .unwrap();
        assert_eq!(pos.unrealized_pnl(110.0), 20.0);
        assert_eq!(pos.unrealized_pnl(90.0), -20.0);
    }

    #[test]
    fn short_pnl_follows_price_down() {
        let pos = Position::open_short(
            Symbol::BtcUsdt,
            2.0,
            100.0,
            5.0,
            ts(),
            TradingMode::Futures,
        )
        .unwrap();
        assert!(pos.size < 0.0);
        assert_eq!(pos.side, PositionSide::Short);
        assert_eq!(pos.unrealized_pnl(90.0), 20.0);
        assert_eq!(pos.unrealized_pnl(110.0), -20.0);
    }

    #[test]
    fn spot_margin_is_full_notional() {
        let pos = Position::open_long(
            Symbol::EthUsdt,
            10.0,
            50.0,
            1.0,
            ts(),
            TradingMode::Spot,
        )
        .unwrap();
        assert_eq!(pos.margin_used, 500.0);
    }

    #[test]
    fn futures_margin_divided_by_leverage() {
        let pos = Position::open_long(
            Symbol::BtcUsdt,
            10.0,
            100.0,
            10.0,
            ts(),
            TradingMode::Futures,
        )
        .unwrap();
        assert_eq!(pos.margin_used, 100.0);
    }

    #[test]
    fn short_rejected_in_spot() {
        let result = Position::open_short(
            Symbol::BtcUsdt,
            1.0,
            100.0,
            1.0,
            ts(),
            TradingMode::Spot,
        );
        assert!(matches!(result, Err(PositionError::ShortInSpot)));
    }

    #[test]
    fn liquidation_threshold_at_maintenance_buffer() {
        // margin 100, maintenance 0.005 -> liquidates when upnl <= -99.5
        let pos = Position::open_long(
            Symbol::BtcUsdt,
            10.0,
            100.0,
            10.0,
            ts(),
            TradingMode::Futures,
        )
        .unwrap();
        assert!(!pos.is_liquidation_risk(90.1, 0.005)); // upnl = -99
        assert!(pos.is_liquidation_risk(90.05, 0.005)); // upnl = -99.5
        assert!(pos.is_liquidation_risk(89.0, 0.005)); // upnl = -110
    }

    #[test]
    fn at_entry_price_not_at_risk() {
        let pos = Position::open_short(
            Symbol::BtcUsdt,
            1.0,
            200.0,
            5.0,
            ts(),
            TradingMode::Futures,
        )
        .unwrap();
        assert!(!pos.is_liquidation_risk(200.0, 0.005));
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert!(Position::open_long(
            Symbol::BtcUsdt,
            0.0,
            100.0,
            1.0,
            ts(),
            TradingMode::Spot
        )
        .is_err());
        assert!(Position::open_long(
            Symbol::BtcUsdt,
            1.0,
            f64::NAN,
            1.0,
            ts(),
            TradingMode::Spot
        )
        .is_err());
    }
}
