//! The strategy contract.
//!
//! A strategy is an opaque object the driver calls back per bar; its only
//! handle on the engine is the [`StrategyContext`] trading API. Errors a
//! strategy returns are fatal for the run: the driver stops, keeps the
//! partial history, and marks the result failed.

pub mod examples;

use crate::engine::context::StrategyContext;
use crate::domain::Bar;
use crate::portfolio::OrderError;
use thiserror::Error;

/// Error raised by a strategy callback. Aborts the run.
#[derive(Debug, Error)]
#[error("strategy error: {message}")]
pub struct StrategyError {
    message: String,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Order failures convert directly, so a strategy can `?` an order it
/// considers mandatory, or match on the result and trade on.
impl From<OrderError> for StrategyError {
    fn from(e: OrderError) -> Self {
        Self::new(e.to_string())
    }
}

/// User-supplied trading logic.
pub trait Strategy: Send {
    /// Called once before the first bar.
    fn initialize(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called for every bar, ascending in time, after liquidations for that
    /// bar have been applied.
    fn on_data(&mut self, bar: &Bar, ctx: &mut StrategyContext) -> Result<(), StrategyError>;
}
