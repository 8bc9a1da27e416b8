//! On-disk layout of the market data tree.
//!
//! `{root}/binance/{spot|futures}/{SYMBOL}/{TIMEFRAME}/{SYMBOL}_{TIMEFRAME}_{YYYY-MM-DD}.csv`
//!
//! Path components come from the typed `Symbol`/`Timeframe`/`TradingMode`
//! enums, which keeps the component set closed; discovery goes the other
//! way and only accepts directory names that parse back into those enums.

use crate::domain::{Symbol, Timeframe, TradingMode};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// The only supported venue directory.
pub const VENUE: &str = "binance";

/// Directory holding per-symbol trees for a trading mode.
pub fn market_dir(root: &Path, mode: TradingMode) -> PathBuf {
    root.join(VENUE).join(mode.as_str())
}

/// Directory holding the day files for one (symbol, timeframe).
pub fn timeframe_dir(
    root: &Path,
    mode: TradingMode,
    symbol: Symbol,
    timeframe: Timeframe,
) -> PathBuf {
    market_dir(root, mode)
        .join(symbol.as_str())
        .join(timeframe.as_str())
}

/// Full path of the day file for one UTC date.
pub fn day_file_path(
    root: &Path,
    mode: TradingMode,
    symbol: Symbol,
    timeframe: Timeframe,
    date: NaiveDate,
) -> PathBuf {
    timeframe_dir(root, mode, symbol, timeframe).join(format!(
        "{}_{}_{}.csv",
        symbol.as_str(),
        timeframe.as_str(),
        date.format("%Y-%m-%d"),
    ))
}

/// Inclusive list of UTC dates covered by `[start, end]`.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start.date_naive();
    let last = end.date_naive();
    while current <= last {
        days.push(current);
        current = current.succ_opt().expect("date overflow");
    }
    days
}
