//! Orchestrates a single backtest: driver run, metrics, run identity.

use crate::fingerprint::RunId;
use crate::metrics::PerformanceMetrics;
use anyhow::{Context, Result};
use candlelab_core::config::BacktestConfig;
use candlelab_core::data::OhlcvStore;
use candlelab_core::engine::{BacktestDriver, BacktestResult};
use candlelab_core::strategy::Strategy;
use std::sync::Arc;

/// A finished run with its identity and computed statistics.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub result: BacktestResult,
    pub metrics: PerformanceMetrics,
}

/// Runs backtests against one shared data store.
pub struct Runner {
    store: Arc<OhlcvStore>,
}

impl Runner {
    pub fn new(store: Arc<OhlcvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<OhlcvStore> {
        &self.store
    }

    /// Execute one backtest and compute its performance metrics.
    ///
    /// A failed strategy still yields an outcome (partial history, failed
    /// status); only configuration and data errors surface as `Err`.
    pub fn run(
        &self,
        config: BacktestConfig,
        strategy: &mut dyn Strategy,
    ) -> Result<RunOutcome> {
        let run_id = RunId::from_config(&config).context("failed to fingerprint config")?;
        let driver = BacktestDriver::new(Arc::clone(&self.store), config.clone());
        let result = driver
            .run(strategy)
            .with_context(|| format!("backtest {run_id} failed"))?;
        let metrics = PerformanceMetrics::compute(
            &result.history,
            &result.trades,
            config.initial_capital,
            config.timeframe,
        );
        Ok(RunOutcome {
            run_id,
            result,
            metrics,
        })
    }
}
