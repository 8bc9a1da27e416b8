//! The trading API handed to strategy callbacks.

use crate::config::BacktestConfig;
use crate::domain::Symbol;
use crate::portfolio::{
    ExecutionParams, MarkPrices, OrderEngine, OrderError, PortfolioCore, PortfolioMetrics,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Context passed to `initialize` and `on_data`.
///
/// Orders placed through it execute at the current bar's close and carry the
/// current bar's timestamp; the driver refreshes `symbol`, `current_price`,
/// and `current_time` before each callback.
pub struct StrategyContext {
    core: Arc<PortfolioCore>,
    orders: OrderEngine,
    metrics: PortfolioMetrics,
    pub symbol: Symbol,
    pub current_price: f64,
    pub current_time: DateTime<Utc>,
}

impl StrategyContext {
    pub(crate) fn new(core: Arc<PortfolioCore>, config: &BacktestConfig) -> Self {
        let params = ExecutionParams::from_config(config);
        Self {
            orders: OrderEngine::new(Arc::clone(&core), params),
            metrics: PortfolioMetrics::new(Arc::clone(&core)),
            core,
            symbol: config.symbol,
            current_price: 0.0,
            current_time: config.start,
        }
    }

    pub(crate) fn set_bar(&mut self, price: f64, time: DateTime<Utc>) {
        self.current_price = price;
        self.current_time = time;
    }

    fn marks(&self) -> MarkPrices {
        MarkPrices::from([(self.symbol, self.current_price)])
    }

    /// Buy `amount` at the current bar's close.
    pub fn buy(&self, amount: f64, leverage: f64) -> Result<(), OrderError> {
        self.orders
            .buy(self.symbol, amount, self.current_price, leverage, self.current_time)
    }

    /// Sell `amount` at the current bar's close.
    pub fn sell(&self, amount: f64, leverage: f64) -> Result<(), OrderError> {
        self.orders
            .sell(self.symbol, amount, self.current_price, leverage, self.current_time)
    }

    /// Close `percentage` of the open position at the current bar's close.
    pub fn close_position(&self, percentage: f64) -> Result<f64, OrderError> {
        self.orders
            .close_position(self.symbol, percentage, self.current_price, self.current_time)
    }

    /// Signed size of the open position; 0 when flat.
    pub fn position_size(&self) -> f64 {
        self.metrics.position_size(self.symbol)
    }

    pub fn cash(&self) -> f64 {
        self.core.cash()
    }

    /// Margin ratio at the current bar's close; +inf when no margin is used.
    pub fn margin_ratio(&self) -> f64 {
        self.metrics.margin_ratio(&self.marks())
    }

    /// Unrealized PnL at the current bar's close.
    pub fn unrealized_pnl(&self) -> f64 {
        self.metrics.unrealized_pnl(&self.marks())
    }

    /// Leverage of the open position; 0 when flat.
    pub fn leverage(&self) -> f64 {
        self.metrics.position_leverage(self.symbol)
    }
}
