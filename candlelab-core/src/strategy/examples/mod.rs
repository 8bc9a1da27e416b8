//! Bundled example strategies, used by the CLI and the integration tests.

pub mod buy_and_hold;
pub mod sma_crossover;

pub use buy_and_hold::BuyAndHold;
pub use sma_crossover::SmaCrossover;
