//! Performance metrics: pure functions over history and trades.
//!
//! Every metric is a pure function: snapshot series and/or trade list in,
//! scalar out. Annualization uses the 24/7 crypto calendar (365 days), so
//! the scaling factor comes from `Timeframe::bars_per_year`. All divisors
//! are guarded; degenerate inputs produce the documented sentinels rather
//! than NaN.

use candlelab_core::domain::{Snapshot, Timeframe, Trade, TradeAction};
use serde::{Deserialize, Serialize};

/// Aggregate performance statistics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// (final value - initial capital) / initial capital.
    pub total_return: f64,
    /// Sample standard deviation of per-bar returns.
    pub volatility: f64,
    /// Annualized mean/stdev of per-bar returns; 0 when flat.
    pub sharpe_ratio: f64,
    /// As Sharpe but over downside deviation; 0 when no losing bars.
    pub sortino_ratio: f64,
    /// Largest peak-to-trough drop as a positive fraction.
    pub max_drawdown: f64,
    pub total_trades: usize,
    /// Fraction of closing trades with positive PnL.
    pub win_rate: f64,
    /// Gross profit over gross loss; +inf with gains and no losses.
    /// JSON renders the infinite case as null and reads it back as +inf.
    #[serde(deserialize_with = "nullable_infinity")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Forced closes in the trade log.
    pub liquidations: usize,
    /// Trade-count-weighted mean leverage over all trades.
    pub avg_leverage: f64,
    pub max_leverage: f64,
}

impl PerformanceMetrics {
    pub fn compute(
        history: &[Snapshot],
        trades: &[Trade],
        initial_capital: f64,
        timeframe: Timeframe,
    ) -> Self {
        let values: Vec<f64> = history.iter().map(|s| s.portfolio_value).collect();
        let returns = bar_returns(&values);
        let bars_per_year = timeframe.bars_per_year();

        Self {
            total_return: total_return(&values, initial_capital),
            volatility: std_dev(&returns),
            sharpe_ratio: sharpe_ratio(&returns, bars_per_year),
            sortino_ratio: sortino_ratio(&returns, bars_per_year),
            max_drawdown: max_drawdown(&values),
            total_trades: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            liquidations: liquidations(trades),
            avg_leverage: avg_leverage(trades),
            max_leverage: max_leverage(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Return relative to the starting capital; 0 on an empty history.
pub fn total_return(values: &[f64], initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    match values.last() {
        Some(final_value) => (final_value - initial_capital) / initial_capital,
        None => 0.0,
    }
}

/// Per-bar simple returns of the value series.
pub fn bar_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Annualized Sharpe ratio. 0 when variance vanishes or under 2 returns.
pub fn sharpe_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean(returns) / std) * bars_per_year.sqrt()
}

/// Annualized Sortino ratio: downside deviation only, averaged over all
/// bars. 0 when no bar lost money.
pub fn sortino_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return 0.0;
    }
    let downside_std = (downside_sq.iter().sum::<f64>() / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean(returns) / downside_std) * bars_per_year.sqrt()
}

/// Maximum drawdown as a positive fraction of the running peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Closing trades carry the realized PnL; opens don't count toward wins
/// or losses.
fn closing_trades(trades: &[Trade]) -> impl Iterator<Item = &Trade> {
    trades.iter().filter(|t| t.is_closing())
}

/// Fraction of closing trades that made money; 0 with no closes.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let closed: Vec<&Trade> = closing_trades(trades).collect();
    if closed.is_empty() {
        return 0.0;
    }
    let wins = closed.iter().filter(|t| t.pnl > 0.0).count();
    wins as f64 / closed.len() as f64
}

/// Gross profit over gross loss. +inf when there are gains but no losses,
/// 0 when there are no gains.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = closing_trades(trades)
        .filter(|t| t.pnl > 0.0)
        .map(|t| t.pnl)
        .sum();
    let gross_loss: f64 = closing_trades(trades)
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss < 1e-12 {
        if gross_profit > 0.0 {
            return f64::INFINITY;
        }
        return 0.0;
    }
    gross_profit / gross_loss
}

/// Mean winning PnL; 0 with no winners.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = closing_trades(trades)
        .filter(|t| t.pnl > 0.0)
        .map(|t| t.pnl)
        .collect();
    if wins.is_empty() {
        return 0.0;
    }
    wins.iter().sum::<f64>() / wins.len() as f64
}

/// Mean losing PnL (negative); 0 with no losers.
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = closing_trades(trades)
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl)
        .collect();
    if losses.is_empty() {
        return 0.0;
    }
    losses.iter().sum::<f64>() / losses.len() as f64
}

pub fn liquidations(trades: &[Trade]) -> usize {
    trades
        .iter()
        .filter(|t| t.action == TradeAction::Liquidation)
        .count()
}

/// Trade-count-weighted mean leverage; 0 with no trades.
pub fn avg_leverage(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.leverage).sum::<f64>() / trades.len() as f64
}

pub fn max_leverage(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.leverage).fold(0.0, f64::max)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// serde_json writes non-finite floats as null; treat null as +inf on the
/// way back in.
fn nullable_infinity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::INFINITY))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 under 2 points.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
