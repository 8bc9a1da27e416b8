//! Risk engine: liquidation scanning and forced closes.

use crate::config::BacktestConfig;
use crate::domain::{Symbol, Trade, TradeAction};
use crate::portfolio::orders::OrderError;
use crate::portfolio::state::{MarkPrices, PortfolioCore, PortfolioState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Scans positions against the maintenance margin and force-closes the
/// breached ones. Spot portfolios are never scanned: no margin, no
/// liquidation.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    core: Arc<PortfolioCore>,
    maintenance_margin_rate: f64,
    taker_fee_rate: f64,
}

impl RiskEngine {
    pub fn new(core: Arc<PortfolioCore>, maintenance_margin_rate: f64, taker_fee_rate: f64) -> Self {
        Self {
            core,
            maintenance_margin_rate,
            taker_fee_rate,
        }
    }

    pub fn from_config(core: Arc<PortfolioCore>, config: &BacktestConfig) -> Self {
        Self::new(core, config.maintenance_margin_rate, config.taker_fee_rate)
    }

    /// Symbols whose positions breach the maintenance threshold at the
    /// given marks, in position-insertion order (stable across runs).
    pub fn scan_liquidations(&self, marks: &MarkPrices) -> Vec<Symbol> {
        let state = self.core.lock();
        if !state.mode().has_liquidation() {
            return Vec::new();
        }
        state
            .positions()
            .iter()
            .filter(|position| {
                marks
                    .get(&position.symbol)
                    .is_some_and(|&mark| {
                        position.is_liquidation_risk(mark, self.maintenance_margin_rate)
                    })
            })
            .map(|position| position.symbol)
            .collect()
    }

    /// Force-close a position at `price`, charging `fee`. Returns the
    /// realized PnL (`unrealized - fee`); cash receives the released margin
    /// plus that PnL, and a Liquidation trade is appended.
    pub fn close_at_price(
        &self,
        symbol: Symbol,
        price: f64,
        fee: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64, OrderError> {
        let mut state = self.core.lock();
        Self::force_close(&mut state, symbol, price, fee, timestamp)
    }

    /// Forced close with the fee computed from the liquidated notional at
    /// the configured taker rate. The driver's per-bar entry point.
    pub fn liquidate(
        &self,
        symbol: Symbol,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64, OrderError> {
        let mut state = self.core.lock();
        let size_abs = state
            .position(symbol)
            .ok_or(OrderError::PositionNotFound { symbol })?
            .size
            .abs();
        let fee = size_abs * price * self.taker_fee_rate;
        Self::force_close(&mut state, symbol, price, fee, timestamp)
    }

    fn force_close(
        state: &mut PortfolioState,
        symbol: Symbol,
        price: f64,
        fee: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64, OrderError> {
        let index = state
            .position_index(symbol)
            .ok_or(OrderError::PositionNotFound { symbol })?;
        let position = state.remove_position(index);
        let pnl = position.unrealized_pnl(price) - fee;
        state.cash += position.margin_used + pnl;
        state.push_trade(Trade {
            timestamp,
            symbol,
            action: TradeAction::Liquidation,
            quantity: position.size.abs(),
            price,
            leverage: position.leverage,
            fee,
            side: position.side,
            pnl,
            margin_used: 0.0,
        });
        Ok(pnl)
    }
}
