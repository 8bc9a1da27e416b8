//! The backtest driver: window load, per-bar loop, result assembly.
//!
//! Per-bar order is fixed: refresh context, run the liquidation scan and
//! forced closes at the bar's close, invoke the strategy, then snapshot.
//! A strategy cannot observe a snapshot that reflects its own current-bar
//! orders; the snapshot is taken after the callback returns.

use crate::config::{BacktestConfig, ConfigError};
use crate::data::{DataError, OhlcvStore};
use crate::domain::{Position, Snapshot, Trade};
use crate::engine::context::StrategyContext;
use crate::portfolio::{MarkPrices, OrderError, PortfolioCore, PortfolioMetrics, RiskEngine};
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("forced close failed: {0}")]
    Risk(#[from] OrderError),
}

/// How a run ended. Strategy failures do not surface as `Err`: the run
/// returns normally with the partial history and this status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed { reason: String },
}

/// Everything a finished (or aborted) run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub trades: Vec<Trade>,
    pub history: Vec<Snapshot>,
    pub final_positions: Vec<Position>,
    pub final_cash: f64,
    pub final_value: f64,
    pub bars_processed: usize,
    pub status: RunStatus,
}

impl BacktestResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, RunStatus::Failed { .. })
    }

    pub fn total_return(&self) -> f64 {
        if self.config.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.final_value - self.config.initial_capital) / self.config.initial_capital
    }
}

/// Couples the data layer, the portfolio engine, and a strategy into one
/// deterministic single-threaded simulation.
pub struct BacktestDriver {
    store: Arc<OhlcvStore>,
    config: BacktestConfig,
}

impl BacktestDriver {
    pub fn new(store: Arc<OhlcvStore>, config: BacktestConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn run(&self, strategy: &mut dyn Strategy) -> Result<BacktestResult, BacktestError> {
        self.config.validate()?;
        let window = self.store.load_window(
            self.config.symbol,
            self.config.timeframe,
            self.config.start,
            self.config.end,
        )?;

        let core = Arc::new(PortfolioCore::new(
            self.config.initial_capital,
            self.config.trading_mode,
        ));
        let risk = RiskEngine::from_config(Arc::clone(&core), &self.config);
        let mut ctx = StrategyContext::new(Arc::clone(&core), &self.config);

        let mut status = RunStatus::Completed;
        let mut bars_processed = 0usize;
        let mut marks = MarkPrices::new();

        if let Err(e) = strategy.initialize(&mut ctx) {
            status = RunStatus::Failed {
                reason: e.to_string(),
            };
        } else {
            for bar in window.bars() {
                ctx.set_bar(bar.close, bar.timestamp);
                marks.insert(self.config.symbol, bar.close);

                for symbol in risk.scan_liquidations(&marks) {
                    risk.liquidate(symbol, bar.close, bar.timestamp)?;
                }

                if let Err(e) = strategy.on_data(bar, &mut ctx) {
                    status = RunStatus::Failed {
                        reason: e.to_string(),
                    };
                    break;
                }

                core.record_snapshot(bar.timestamp, &marks);
                bars_processed += 1;
            }
        }

        let final_value = if marks.is_empty() {
            core.cash()
        } else {
            PortfolioMetrics::new(Arc::clone(&core)).portfolio_value(&marks)
        };

        Ok(BacktestResult {
            config: self.config.clone(),
            trades: core.trades(),
            history: core.history(),
            final_positions: core.positions(),
            final_cash: core.cash(),
            final_value,
            bars_processed,
            status,
        })
    }
}
