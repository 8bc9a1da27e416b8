use crate::domain::Bar;
use crate::engine::context::StrategyContext;
use crate::strategy::{Strategy, StrategyError};

/// Buys a fixed quantity on the first bar and holds to the end.
#[derive(Debug)]
pub struct BuyAndHold {
    amount: f64,
    leverage: f64,
    entered: bool,
}

impl BuyAndHold {
    pub fn new(amount: f64, leverage: f64) -> Self {
        Self {
            amount,
            leverage,
            entered: false,
        }
    }
}

impl Strategy for BuyAndHold {
    fn on_data(&mut self, _bar: &Bar, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        if !self.entered {
            ctx.buy(self.amount, self.leverage)?;
            self.entered = true;
        }
        Ok(())
    }
}
