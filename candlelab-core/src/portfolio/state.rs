//! Portfolio state and the single lock that guards it.

use crate::constants::{
    HISTORY_TRIM_TO, MAX_HISTORY_ENTRIES, MAX_POSITIONS_PER_PORTFOLIO, MAX_TRADE_SIZE,
    VALUE_EPSILON,
};
use crate::domain::{Position, Snapshot, Symbol, Trade, TradingMode};
use crate::portfolio::orders::OrderError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Mark prices per symbol, as supplied by the driver each bar.
pub type MarkPrices = HashMap<Symbol, f64>;

/// The mutable portfolio fields. Positions live in a `Vec` so iteration is
/// insertion-ordered (the determinism contract); with at most
/// [`MAX_POSITIONS_PER_PORTFOLIO`] entries, linear symbol lookup is cheap.
#[derive(Debug)]
pub struct PortfolioState {
    initial_capital: f64,
    pub(crate) cash: f64,
    pub(crate) positions: Vec<Position>,
    pub(crate) trades: Vec<Trade>,
    pub(crate) history: Vec<Snapshot>,
    mode: TradingMode,
}

impl PortfolioState {
    fn new(initial_capital: f64, mode: TradingMode) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: Vec::new(),
            trades: Vec::new(),
            history: Vec::new(),
            mode,
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn position(&self, symbol: Symbol) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub(crate) fn position_index(&self, symbol: Symbol) -> Option<usize> {
        self.positions.iter().position(|p| p.symbol == symbol)
    }

    pub(crate) fn add_position(&mut self, position: Position) -> Result<(), OrderError> {
        if self.positions.len() >= MAX_POSITIONS_PER_PORTFOLIO {
            return Err(OrderError::Validation(format!(
                "position limit reached ({MAX_POSITIONS_PER_PORTFOLIO})"
            )));
        }
        debug_assert!(
            self.position(position.symbol).is_none(),
            "duplicate position for {}",
            position.symbol
        );
        self.positions.push(position);
        Ok(())
    }

    pub(crate) fn remove_position(&mut self, index: usize) -> Position {
        self.positions.remove(index)
    }

    pub(crate) fn push_trade(&mut self, trade: Trade) {
        // Order inputs are bounded by [MIN_TRADE_SIZE, MAX_TRADE_SIZE];
        // derived close quantities only have to stay positive and bounded.
        debug_assert!(trade.quantity > 0.0 && trade.quantity <= MAX_TRADE_SIZE);
        self.trades.push(trade);
    }

    /// Append a snapshot, compacting the history once it outgrows the
    /// bound: one front drain keeps the newest entries, no per-element pops.
    pub(crate) fn record_snapshot(&mut self, timestamp: DateTime<Utc>, marks: &MarkPrices) {
        let snapshot = Snapshot {
            timestamp,
            portfolio_value: portfolio_value(self, marks),
            cash: self.cash,
            unrealized_pnl: unrealized_pnl(self, marks),
            realized_pnl: realized_pnl(self),
            margin_used: used_margin(self),
            position_count: self.positions.len(),
            leverage_ratio: leverage_ratio(self),
        };
        self.history.push(snapshot);
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.history.len() - HISTORY_TRIM_TO;
            self.history.drain(..excess);
        }
    }

    /// Structural invariants, enforced in debug builds after every
    /// committed mutation.
    pub(crate) fn check_invariants(&self) {
        debug_assert!(self.cash >= -VALUE_EPSILON, "cash went negative: {}", self.cash);
        debug_assert!(self.positions.len() <= MAX_POSITIONS_PER_PORTFOLIO);
        debug_assert!(self.history.len() <= MAX_HISTORY_ENTRIES);
        #[cfg(debug_assertions)]
        {
            for (i, a) in self.positions.iter().enumerate() {
                for b in &self.positions[i + 1..] {
                    debug_assert!(a.symbol != b.symbol, "duplicate symbol {}", a.symbol);
                }
            }
        }
    }
}

// ── Valuation helpers (shared by snapshots and PortfolioMetrics) ─────

/// Mark-to-market PnL summed over positions with a known mark.
pub(crate) fn unrealized_pnl(state: &PortfolioState, marks: &MarkPrices) -> f64 {
    state
        .positions
        .iter()
        .filter_map(|p| marks.get(&p.symbol).map(|&mark| p.unrealized_pnl(mark)))
        .sum()
}

pub(crate) fn used_margin(state: &PortfolioState) -> f64 {
    state.positions.iter().map(|p| p.margin_used).sum()
}

/// Sum of per-trade realized PnL over the whole log.
pub(crate) fn realized_pnl(state: &PortfolioState) -> f64 {
    state.trades.iter().map(|t| t.pnl).sum()
}

/// Futures: equity (cash + unrealized PnL). Spot: cash + asset values.
pub(crate) fn portfolio_value(state: &PortfolioState, marks: &MarkPrices) -> f64 {
    match state.mode() {
        TradingMode::Futures => state.cash + unrealized_pnl(state, marks),
        TradingMode::Spot => {
            let assets: f64 = state
                .positions
                .iter()
                .filter_map(|p| marks.get(&p.symbol).map(|&mark| p.position_value(mark)))
                .sum();
            state.cash + assets
        }
    }
}

/// Equity over used margin; +inf with no margin in use.
pub(crate) fn margin_ratio(state: &PortfolioState, marks: &MarkPrices) -> f64 {
    let used = used_margin(state);
    if used == 0.0 {
        return f64::INFINITY;
    }
    (state.cash + unrealized_pnl(state, marks)) / used
}

/// Margin committed relative to initial capital; 0 for spot portfolios.
pub(crate) fn leverage_ratio(state: &PortfolioState) -> f64 {
    match state.mode() {
        TradingMode::Spot => 0.0,
        TradingMode::Futures => used_margin(state) / state.initial_capital(),
    }
}

/// The portfolio state behind its single lock.
///
/// Components lock once per public operation; internal helpers take
/// `&mut PortfolioState` and never re-acquire, which is how the source
/// system's reentrant lock renders without one.
#[derive(Debug)]
pub struct PortfolioCore {
    state: Mutex<PortfolioState>,
}

impl PortfolioCore {
    pub fn new(initial_capital: f64, mode: TradingMode) -> Self {
        Self {
            state: Mutex::new(PortfolioState::new(initial_capital, mode)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, PortfolioState> {
        self.state.lock().unwrap()
    }

    /// Record one history snapshot under a single lock acquisition.
    pub fn record_snapshot(&self, timestamp: DateTime<Utc>, marks: &MarkPrices) {
        self.lock().record_snapshot(timestamp, marks);
    }

    pub fn initial_capital(&self) -> f64 {
        self.lock().initial_capital()
    }

    pub fn cash(&self) -> f64 {
        self.lock().cash
    }

    pub fn mode(&self) -> TradingMode {
        self.lock().mode()
    }

    pub fn position_count(&self) -> usize {
        self.lock().positions.len()
    }

    /// Copies of the open positions, insertion-ordered.
    pub fn positions(&self) -> Vec<Position> {
        self.lock().positions.clone()
    }

    /// Copy of the trade log.
    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    /// Copy of the snapshot history.
    pub fn history(&self) -> Vec<Snapshot> {
        self.lock().history.clone()
    }
}
