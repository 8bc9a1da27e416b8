use crate::domain::Bar;
use crate::engine::context::StrategyContext;
use crate::strategy::{Strategy, StrategyError};

/// Classic moving-average crossover.
///
/// Buys when the fast SMA crosses above the slow one and is flat; closes
/// the position on the cross back down. Long-only, so it runs unchanged in
/// spot and futures modes.
#[derive(Debug)]
pub struct SmaCrossover {
    fast_period: usize,
    slow_period: usize,
    amount: f64,
    leverage: f64,
    closes: Vec<f64>,
    was_above: Option<bool>,
}

impl SmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize, amount: f64, leverage: f64) -> Self {
        Self {
            fast_period: fast_period.max(1),
            slow_period: slow_period.max(2),
            amount,
            leverage,
            closes: Vec::new(),
            was_above: None,
        }
    }

    fn sma(&self, period: usize) -> Option<f64> {
        if self.closes.len() < period {
            return None;
        }
        let window = &self.closes[self.closes.len() - period..];
        Some(window.iter().sum::<f64>() / period as f64)
    }
}

impl Strategy for SmaCrossover {
    fn on_data(&mut self, bar: &Bar, ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        self.closes.push(bar.close);

        let (Some(fast), Some(slow)) = (self.sma(self.fast_period), self.sma(self.slow_period))
        else {
            return Ok(());
        };

        let above = fast > slow;
        if let Some(was_above) = self.was_above {
            if above && !was_above && ctx.position_size() == 0.0 {
                ctx.buy(self.amount, self.leverage)?;
            } else if !above && was_above && ctx.position_size() > 0.0 {
                ctx.close_position(100.0)?;
            }
        }
        self.was_above = Some(above);
        Ok(())
    }
}
