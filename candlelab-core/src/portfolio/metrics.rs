//! Read-only portfolio valuation. Never mutates; each accessor holds the
//! core lock only long enough to read a consistent view.

use crate::domain::Symbol;
use crate::portfolio::state::{self, MarkPrices, PortfolioCore};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PortfolioMetrics {
    core: Arc<PortfolioCore>,
}

impl PortfolioMetrics {
    pub fn new(core: Arc<PortfolioCore>) -> Self {
        Self { core }
    }

    /// Futures: cash + unrealized PnL. Spot: cash + asset values.
    pub fn portfolio_value(&self, marks: &MarkPrices) -> f64 {
        let state = self.core.lock();
        state::portfolio_value(&state, marks)
    }

    pub fn used_margin(&self) -> f64 {
        let state = self.core.lock();
        state::used_margin(&state)
    }

    /// Equity over used margin; +inf when no margin is in use.
    pub fn margin_ratio(&self, marks: &MarkPrices) -> f64 {
        let state = self.core.lock();
        state::margin_ratio(&state, marks)
    }

    pub fn realized_pnl(&self) -> f64 {
        let state = self.core.lock();
        state::realized_pnl(&state)
    }

    pub fn unrealized_pnl(&self, marks: &MarkPrices) -> f64 {
        let state = self.core.lock();
        state::unrealized_pnl(&state, marks)
    }

    /// Signed position size; 0 when flat.
    pub fn position_size(&self, symbol: Symbol) -> f64 {
        let state = self.core.lock();
        state.position(symbol).map_or(0.0, |p| p.size)
    }

    /// Leverage of the open position; 0 when flat.
    pub fn position_leverage(&self, symbol: Symbol) -> f64 {
        let state = self.core.lock();
        state.position(symbol).map_or(0.0, |p| p.leverage)
    }

    pub fn position_count(&self) -> usize {
        self.core.position_count()
    }
}
