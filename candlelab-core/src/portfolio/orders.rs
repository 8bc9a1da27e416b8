//! Order execution: buy, sell, and close on top of the portfolio core.
//!
//! Every operation validates its inputs, then takes the core lock once and
//! runs every failure check before the first mutation, so a failed order
//! leaves the portfolio untouched. Opens pay `margin + fee` out of cash and
//! record `pnl = 0`; closes fold the fee into realized PnL and credit the
//! released margin plus that PnL back to cash.

use crate::config::BacktestConfig;
use crate::constants::{MAX_TRADE_SIZE, MIN_TRADE_SIZE, PRICE_EPSILON};
use crate::domain::position::{margin_for, Position, PositionError};
use crate::domain::{PositionSide, Symbol, Trade, TradeAction, TradingMode};
use crate::portfolio::state::{PortfolioCore, PortfolioState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    Validation(String),

    #[error("insufficient funds: required {required:.8}, available {available:.8}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("no open position for {symbol}")]
    PositionNotFound { symbol: Symbol },
}

impl From<PositionError> for OrderError {
    fn from(e: PositionError) -> Self {
        OrderError::Validation(e.to_string())
    }
}

/// Execution parameters shared by the order and risk engines.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionParams {
    pub mode: TradingMode,
    pub max_leverage: f64,
    pub taker_fee_rate: f64,
}

impl ExecutionParams {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            mode: config.trading_mode,
            max_leverage: config.max_leverage,
            taker_fee_rate: config.taker_fee_rate,
        }
    }
}

/// Buy/sell/close operations against one shared portfolio core.
#[derive(Debug, Clone)]
pub struct OrderEngine {
    core: Arc<PortfolioCore>,
    params: ExecutionParams,
}

impl OrderEngine {
    pub fn new(core: Arc<PortfolioCore>, params: ExecutionParams) -> Self {
        Self { core, params }
    }

    /// Buy: open or extend a long, or net down an existing short.
    pub fn buy(
        &self,
        symbol: Symbol,
        amount: f64,
        price: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        self.validate_order(amount, price, leverage)?;
        let mut state = self.core.lock();
        match state.position_index(symbol) {
            Some(index) if state.positions[index].side == PositionSide::Short => {
                self.close_into_reverse(
                    &mut state,
                    index,
                    symbol,
                    amount,
                    price,
                    leverage,
                    timestamp,
                )?
            }
            Some(index) => {
                self.average_into(&mut state, index, symbol, amount, price, leverage, timestamp)?
            }
            None => self.open_position(
                &mut state,
                symbol,
                PositionSide::Long,
                amount,
                price,
                leverage,
                timestamp,
            )?,
        }
        state.check_invariants();
        Ok(())
    }

    /// Sell: close or shrink a long, or open/extend a short (futures only).
    pub fn sell(
        &self,
        symbol: Symbol,
        amount: f64,
        price: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        self.validate_order(amount, price, leverage)?;
        let mut state = self.core.lock();
        match state.position_index(symbol) {
            Some(index) if state.positions[index].side == PositionSide::Long => {
                self.close_into_reverse(
                    &mut state,
                    index,
                    symbol,
                    amount,
                    price,
                    leverage,
                    timestamp,
                )?
            }
            Some(index) => {
                self.average_into(&mut state, index, symbol, amount, price, leverage, timestamp)?
            }
            None => self.open_position(
                &mut state,
                symbol,
                PositionSide::Short,
                amount,
                price,
                leverage,
                timestamp,
            )?,
        }
        state.check_invariants();
        Ok(())
    }

    /// Close `percentage` (in (0, 100]) of a position at `price`.
    ///
    /// Releases margin proportionally and realizes PnL net of the fee.
    /// A residue below the minimum trade size is swept into a full close.
    /// Returns the realized PnL.
    pub fn close_position(
        &self,
        symbol: Symbol,
        percentage: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64, OrderError> {
        if !percentage.is_finite() || percentage <= 0.0 || percentage > 100.0 + PRICE_EPSILON {
            return Err(OrderError::Validation(format!(
                "close percentage must be in (0, 100], got {percentage}"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(OrderError::Validation(format!(
                "close price must be positive, got {price}"
            )));
        }

        let mut state = self.core.lock();
        let index = state
            .position_index(symbol)
            .ok_or(OrderError::PositionNotFound { symbol })?;

        let position = &state.positions[index];
        let size_abs = position.size.abs();
        let fraction = percentage / 100.0;
        let mut close_qty = size_abs * fraction;
        let full_close =
            percentage >= 100.0 - PRICE_EPSILON || size_abs - close_qty < MIN_TRADE_SIZE;
        if full_close {
            close_qty = size_abs;
        }

        let fee = close_qty * price * self.params.taker_fee_rate;
        let side = position.side;
        let position_leverage = position.leverage;
        let pnl;

        if full_close {
            let position = state.remove_position(index);
            pnl = position.unrealized_pnl(price) - fee;
            state.cash += position.margin_used + pnl;
        } else {
            let position = &mut state.positions[index];
            let released = position.margin_used * fraction;
            pnl = position.unrealized_pnl(price) * fraction - fee;
            position.size *= 1.0 - fraction;
            position.margin_used -= released;
            state.cash += released + pnl;
        }

        // Closing a long sells; closing a short buys back.
        let action = match side {
            PositionSide::Long => TradeAction::Sell,
            PositionSide::Short => TradeAction::Buy,
        };
        state.push_trade(Trade {
            timestamp,
            symbol,
            action,
            quantity: close_qty,
            price,
            leverage: position_leverage,
            fee,
            side,
            pnl,
            margin_used: 0.0,
        });
        state.check_invariants();
        Ok(pnl)
    }

    // ── Internals (all run under the caller's single lock) ───────────

    fn validate_order(&self, amount: f64, price: f64, leverage: f64) -> Result<(), OrderError> {
        for (name, value) in [("amount", amount), ("price", price), ("leverage", leverage)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(OrderError::Validation(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if amount < MIN_TRADE_SIZE {
            return Err(OrderError::Validation(format!(
                "trade size too small: {amount} < {MIN_TRADE_SIZE}"
            )));
        }
        if amount > MAX_TRADE_SIZE {
            return Err(OrderError::Validation(format!(
                "trade size too large: {amount} > {MAX_TRADE_SIZE}"
            )));
        }
        if leverage > self.params.max_leverage + PRICE_EPSILON {
            return Err(OrderError::Validation(format!(
                "leverage {leverage} exceeds maximum {}",
                self.params.max_leverage
            )));
        }
        if self.params.mode == TradingMode::Spot && (leverage - 1.0).abs() > PRICE_EPSILON {
            return Err(OrderError::Validation(format!(
                "spot orders require leverage 1, got {leverage}"
            )));
        }
        Ok(())
    }

    /// Open a fresh position for `side`, charging margin plus fee.
    #[allow(clippy::too_many_arguments)]
    fn open_position(
        &self,
        state: &mut PortfolioState,
        symbol: Symbol,
        side: PositionSide,
        amount: f64,
        price: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if side == PositionSide::Short && !self.params.mode.allows_short() {
            return Err(OrderError::Validation(
                "short selling requires futures mode".into(),
            ));
        }
        let margin_needed = margin_for(amount, price, leverage, self.params.mode);
        let fee = amount * price * self.params.taker_fee_rate;
        if margin_needed + fee > state.cash {
            return Err(OrderError::InsufficientFunds {
                required: margin_needed + fee,
                available: state.cash,
            });
        }

        let position = match side {
            PositionSide::Long => {
                Position::open_long(symbol, amount, price, leverage, timestamp, self.params.mode)?
            }
            PositionSide::Short => {
                Position::open_short(symbol, amount, price, leverage, timestamp, self.params.mode)?
            }
        };
        state.add_position(position)?;
        state.cash -= margin_needed + fee;
        state.push_trade(Trade {
            timestamp,
            symbol,
            action: open_action(side),
            quantity: amount,
            price,
            leverage,
            fee,
            side,
            pnl: 0.0,
            margin_used: margin_needed,
        });
        Ok(())
    }

    /// Extend a same-side position: volume-weighted entry, margins summed
    /// (the existing portion is not re-margined at the new leverage).
    #[allow(clippy::too_many_arguments)]
    fn average_into(
        &self,
        state: &mut PortfolioState,
        index: usize,
        symbol: Symbol,
        amount: f64,
        price: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let side = state.positions[index].side;
        if side == PositionSide::Short && !self.params.mode.allows_short() {
            return Err(OrderError::Validation(
                "short selling requires futures mode".into(),
            ));
        }

        // A zero-sized residue behaves like a fresh open (guards the
        // divide in the weighted average).
        if state.positions[index].size.abs() < PRICE_EPSILON {
            state.remove_position(index);
            return self.open_position(state, symbol, side, amount, price, leverage, timestamp);
        }

        let margin_needed = margin_for(amount, price, leverage, self.params.mode);
        let fee = amount * price * self.params.taker_fee_rate;
        if margin_needed + fee > state.cash {
            return Err(OrderError::InsufficientFunds {
                required: margin_needed + fee,
                available: state.cash,
            });
        }

        let position = &mut state.positions[index];
        let old_abs = position.size.abs();
        let new_abs = old_abs + amount;
        position.entry_price =
            (old_abs * position.entry_price + amount * price) / new_abs;
        position.size = match side {
            PositionSide::Long => new_abs,
            PositionSide::Short => -new_abs,
        };
        position.margin_used += margin_needed;
        state.cash -= margin_needed + fee;

        state.push_trade(Trade {
            timestamp,
            symbol,
            action: open_action(side),
            quantity: amount,
            price,
            leverage,
            fee,
            side,
            pnl: 0.0,
            margin_used: margin_needed,
        });
        Ok(())
    }

    /// An opposite-side order against an existing position: close up to the
    /// held size at `price`, then open the remainder (if any) on the other
    /// side at the same price. Funds for the remainder are checked against
    /// post-close cash before anything mutates.
    #[allow(clippy::too_many_arguments)]
    fn close_into_reverse(
        &self,
        state: &mut PortfolioState,
        index: usize,
        symbol: Symbol,
        amount: f64,
        price: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let position = &state.positions[index];
        let side = position.side;
        let size_abs = position.size.abs();

        if size_abs < PRICE_EPSILON {
            // Zero-sized residue: a fresh open on the order's side.
            state.remove_position(index);
            return self.open_position(
                state,
                symbol,
                side.opposite(),
                amount,
                price,
                leverage,
                timestamp,
            );
        }

        // Sweep a residue below the minimum trade size into the close.
        let mut filled = amount.min(size_abs);
        if size_abs - filled < MIN_TRADE_SIZE {
            filled = size_abs;
        }
        let remainder = (amount - filled).max(0.0);
        let full_close = size_abs - filled < PRICE_EPSILON;
        let reverse_side = side.opposite();

        if remainder >= MIN_TRADE_SIZE
            && reverse_side == PositionSide::Short
            && !self.params.mode.allows_short()
        {
            // Spot sells beyond the held size fail validation; they never
            // open a synthetic short.
            return Err(OrderError::Validation(format!(
                "cannot sell {amount} against a position of {size_abs} in spot mode"
            )));
        }

        let fraction = filled / size_abs;
        let close_fee = filled * price * self.params.taker_fee_rate;
        let pnl = position.unrealized_pnl(price) * fraction - close_fee;
        let released = position.margin_used * fraction;
        let position_leverage = position.leverage;

        let reopen = remainder >= MIN_TRADE_SIZE;
        let reopen_margin = margin_for(remainder, price, leverage, self.params.mode);
        let reopen_fee = remainder * price * self.params.taker_fee_rate;
        if reopen {
            let cash_after_close = state.cash + released + pnl;
            if reopen_margin + reopen_fee > cash_after_close {
                return Err(OrderError::InsufficientFunds {
                    required: reopen_margin + reopen_fee,
                    available: cash_after_close,
                });
            }
        }

        // Commit the closing leg.
        state.cash += released + pnl;
        if full_close {
            state.remove_position(index);
        } else {
            let position = &mut state.positions[index];
            position.size = match side {
                PositionSide::Long => position.size - filled,
                PositionSide::Short => position.size + filled,
            };
            position.margin_used -= released;
        }
        state.push_trade(Trade {
            timestamp,
            symbol,
            action: open_action(reverse_side),
            quantity: filled,
            price,
            leverage: position_leverage,
            fee: close_fee,
            side,
            pnl,
            margin_used: 0.0,
        });

        // Commit the reversing leg.
        if reopen {
            let position = match reverse_side {
                PositionSide::Long => Position::open_long(
                    symbol,
                    remainder,
                    price,
                    leverage,
                    timestamp,
                    self.params.mode,
                )?,
                PositionSide::Short => Position::open_short(
                    symbol,
                    remainder,
                    price,
                    leverage,
                    timestamp,
                    self.params.mode,
                )?,
            };
            state.add_position(position)?;
            state.cash -= reopen_margin + reopen_fee;
            state.push_trade(Trade {
                timestamp,
                symbol,
                action: open_action(reverse_side),
                quantity: remainder,
                price,
                leverage,
                fee: reopen_fee,
                side: reverse_side,
                pnl: 0.0,
                margin_used: reopen_margin,
            });
        }
        Ok(())
    }
}

/// The action that opens (or nets toward) the given side.
fn open_action(side: PositionSide) -> TradeAction {
    match side {
        PositionSide::Long => TradeAction::Buy,
        PositionSide::Short => TradeAction::Sell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn engine(mode: TradingMode, capital: f64, fee: f64) -> (Arc<PortfolioCore>, OrderEngine) {
        let core = Arc::new(PortfolioCore::new(capital, mode));
        let params = ExecutionParams {
            mode,
            max_leverage: mode.max_leverage(),
            taker_fee_rate: fee,
        };
        (Arc::clone(&core), OrderEngine::new(core, params))
    }

    fn futures_engine_with_cap(
        capital: f64,
        max_leverage: f64,
    ) -> (Arc<PortfolioCore>, OrderEngine) {
        let core = Arc::new(PortfolioCore::new(capital, TradingMode::Futures));
        let params = ExecutionParams {
            mode: TradingMode::Futures,
            max_leverage,
            taker_fee_rate: 0.0,
        };
        (Arc::clone(&core), OrderEngine::new(core, params))
    }

    const SYM: Symbol = Symbol::BtcUsdt;

    #[test]
    fn spot_buy_reserves_full_notional() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        orders.buy(SYM, 50.0, 100.0, 1.0, ts()).unwrap();
        assert_eq!(core.cash(), 5_000.0);
        let positions = core.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].size, 50.0);
        assert_eq!(positions[0].margin_used, 5_000.0);
        let trades = core.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].action, TradeAction::Buy);
        assert_eq!(trades[0].pnl, 0.0);
    }

    #[test]
    fn futures_buy_reserves_margin_and_fee() {
        let (core, orders) = engine(TradingMode::Futures, 1_000.0, 0.001);
        orders.buy(SYM, 10.0, 100.0, 10.0, ts()).unwrap();
        // margin 100 + fee 1
        assert!((core.cash() - 899.0).abs() < 1e-9);
        assert_eq!(core.positions()[0].margin_used, 100.0);
        assert_eq!(core.trades()[0].fee, 1.0);
    }

    #[test]
    fn insufficient_funds_leaves_state_untouched() {
        let (core, orders) = engine(TradingMode::Spot, 1_000.0, 0.0);
        let result = orders.buy(SYM, 50.0, 100.0, 1.0, ts());
        assert!(matches!(result, Err(OrderError::InsufficientFunds { .. })));
        assert_eq!(core.cash(), 1_000.0);
        assert_eq!(core.position_count(), 0);
        assert!(core.trades().is_empty());
    }

    #[test]
    fn validation_rejects_bad_inputs() {
        let (_, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        assert!(orders.buy(SYM, 0.0, 100.0, 1.0, ts()).is_err());
        assert!(orders.buy(SYM, -1.0, 100.0, 1.0, ts()).is_err());
        assert!(orders.buy(SYM, 1.0, f64::NAN, 1.0, ts()).is_err());
        assert!(orders.buy(SYM, 1e-6, 100.0, 1.0, ts()).is_err());
        assert!(orders.buy(SYM, 2e6, 100.0, 1.0, ts()).is_err());
        assert!(orders.buy(SYM, 1.0, 100.0, 200.0, ts()).is_err());
    }

    #[test]
    fn spot_rejects_leverage_above_one() {
        let (_, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        let result = orders.buy(SYM, 1.0, 100.0, 2.0, ts());
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[test]
    fn max_leverage_one_rejects_higher_leverage_in_futures() {
        let (_, orders) = futures_engine_with_cap(10_000.0, 1.0);
        assert!(orders.buy(SYM, 1.0, 100.0, 2.0, ts()).is_err());
        assert!(orders.buy(SYM, 1.0, 100.0, 1.0, ts()).is_ok());
    }

    #[test]
    fn averaging_uses_volume_weighted_entry() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.buy(SYM, 1.0, 100.0, 5.0, ts()).unwrap();
        orders.buy(SYM, 3.0, 120.0, 5.0, ts()).unwrap();
        let positions = core.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].size, 4.0);
        // (1*100 + 3*120) / 4 = 115
        assert!((positions[0].entry_price - 115.0).abs() < 1e-9);
        // margins summed: 20 + 72
        assert!((positions[0].margin_used - 92.0).abs() < 1e-9);
    }

    #[test]
    fn short_average_in_matches_weighted_entry() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.sell(SYM, 1.0, 200.0, 5.0, ts()).unwrap();
        orders.sell(SYM, 1.0, 180.0, 5.0, ts()).unwrap();
        let positions = core.positions();
        assert_eq!(positions[0].size, -2.0);
        assert!((positions[0].entry_price - 190.0).abs() < 1e-9);
    }

    #[test]
    fn spot_sell_of_unheld_asset_fails_validation() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        let result = orders.sell(SYM, 1.0, 100.0, 1.0, ts());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(core.position_count(), 0);
    }

    #[test]
    fn spot_sell_beyond_held_size_fails_validation() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        orders.buy(SYM, 10.0, 100.0, 1.0, ts()).unwrap();
        let result = orders.sell(SYM, 20.0, 100.0, 1.0, ts());
        assert!(matches!(result, Err(OrderError::Validation(_))));
        // Nothing mutated by the failed order.
        assert_eq!(core.positions()[0].size, 10.0);
        assert_eq!(core.cash(), 9_000.0);
    }

    #[test]
    fn round_trip_at_same_price_restores_cash_without_fees() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        orders.buy(SYM, 50.0, 100.0, 1.0, ts()).unwrap();
        orders.sell(SYM, 50.0, 100.0, 1.0, ts()).unwrap();
        assert!((core.cash() - 10_000.0).abs() < 1e-9);
        assert_eq!(core.position_count(), 0);
        assert_eq!(core.trades().len(), 2);
    }

    #[test]
    fn sell_closing_long_realizes_profit() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.0);
        orders.buy(SYM, 10.0, 100.0, 1.0, ts()).unwrap();
        orders.sell(SYM, 10.0, 110.0, 1.0, ts()).unwrap();
        assert!((core.cash() - 10_100.0).abs() < 1e-9);
        let trades = core.trades();
        assert_eq!(trades[1].action, TradeAction::Sell);
        assert!((trades[1].pnl - 100.0).abs() < 1e-9);
    }

    #[test]
    fn buy_flips_short_into_long_with_remainder() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.sell(SYM, 2.0, 100.0, 5.0, ts()).unwrap();
        // Buy 5: close the 2-short at 90 (pnl +20), open 3 long.
        orders.buy(SYM, 5.0, 90.0, 5.0, ts()).unwrap();

        let positions = core.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, PositionSide::Long);
        assert!((positions[0].size - 3.0).abs() < 1e-9);
        assert_eq!(positions[0].entry_price, 90.0);

        let trades = core.trades();
        assert_eq!(trades.len(), 3);
        assert!((trades[1].pnl - 20.0).abs() < 1e-9); // short close leg
        assert_eq!(trades[1].quantity, 2.0);
        assert_eq!(trades[2].quantity, 3.0); // fresh long leg
        assert_eq!(trades[2].pnl, 0.0);

        // cash: 10000 - 40 (short margin) +40 +20 (close) -54 (new margin)
        assert!((core.cash() - 9_966.0).abs() < 1e-9);
    }

    #[test]
    fn partial_opposite_order_shrinks_position() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.sell(SYM, 4.0, 100.0, 5.0, ts()).unwrap();
        orders.buy(SYM, 1.0, 95.0, 5.0, ts()).unwrap();
        let positions = core.positions();
        assert_eq!(positions[0].side, PositionSide::Short);
        assert!((positions[0].size + 3.0).abs() < 1e-9);
        // Quarter of the margin released.
        assert!((positions[0].margin_used - 60.0).abs() < 1e-9);
        let trades = core.trades();
        assert_eq!(trades.len(), 2);
        assert!((trades[1].pnl - 5.0).abs() < 1e-9);
    }

    #[test]
    fn close_position_full_removes_position() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.buy(SYM, 2.0, 100.0, 10.0, ts()).unwrap();
        let pnl = orders.close_position(SYM, 100.0, 110.0, ts()).unwrap();
        assert!((pnl - 20.0).abs() < 1e-9);
        assert_eq!(core.position_count(), 0);
        assert!((core.cash() - 10_020.0).abs() < 1e-9);
        assert_eq!(core.trades()[1].action, TradeAction::Sell);
    }

    #[test]
    fn close_position_half_halves_size_and_margin() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.buy(SYM, 2.0, 100.0, 10.0, ts()).unwrap();
        orders.close_position(SYM, 50.0, 110.0, ts()).unwrap();
        let positions = core.positions();
        assert!((positions[0].size - 1.0).abs() < 1e-9);
        assert!((positions[0].margin_used - 10.0).abs() < 1e-9);
        // Released 10 margin + 10 pnl on the closed half.
        assert!((core.cash() - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn close_position_sweeps_dust_residue() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.buy(SYM, 1.0, 100.0, 10.0, ts()).unwrap();
        // 99.9999999% leaves a residue below MIN_TRADE_SIZE.
        orders.close_position(SYM, 99.9999999, 100.0, ts()).unwrap();
        assert_eq!(core.position_count(), 0);
        let trades = core.trades();
        assert_eq!(trades[1].quantity, 1.0);
    }

    #[test]
    fn close_missing_position_not_found() {
        let (_, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        let result = orders.close_position(SYM, 100.0, 100.0, ts());
        assert!(matches!(result, Err(OrderError::PositionNotFound { .. })));
    }

    #[test]
    fn close_rejects_bad_percentage() {
        let (_, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.buy(SYM, 1.0, 100.0, 1.0, ts()).unwrap();
        assert!(orders.close_position(SYM, 0.0, 100.0, ts()).is_err());
        assert!(orders.close_position(SYM, 150.0, 100.0, ts()).is_err());
        assert!(orders.close_position(SYM, -5.0, 100.0, ts()).is_err());
    }

    #[test]
    fn closing_a_short_records_a_buy() {
        let (core, orders) = engine(TradingMode::Futures, 10_000.0, 0.0);
        orders.sell(SYM, 2.0, 200.0, 5.0, ts()).unwrap();
        orders.close_position(SYM, 100.0, 170.0, ts()).unwrap();
        let trades = core.trades();
        assert_eq!(trades[1].action, TradeAction::Buy);
        assert_eq!(trades[1].side, PositionSide::Short);
        assert!((trades[1].pnl - 60.0).abs() < 1e-9);
    }

    #[test]
    fn fees_come_out_of_cash_on_both_legs() {
        let (core, orders) = engine(TradingMode::Spot, 10_000.0, 0.001);
        orders.buy(SYM, 10.0, 100.0, 1.0, ts()).unwrap();
        // 10000 - 1000 - 1 fee
        assert!((core.cash() - 8_999.0).abs() < 1e-9);
        orders.sell(SYM, 10.0, 100.0, 1.0, ts()).unwrap();
        // Back to 10000 minus both fees.
        assert!((core.cash() - 9_998.0).abs() < 1e-9);
        let trades = core.trades();
        assert!((trades[1].pnl + 1.0).abs() < 1e-9); // close pnl = 0 - fee
    }
}
