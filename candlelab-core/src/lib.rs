//! Candlelab core engine.
//!
//! Provides the domain types, the concurrent day-file data layer, the
//! portfolio/order/risk engine, and the bar-by-bar backtest driver.

pub mod config;
pub mod constants;
pub mod data;
pub mod domain;
pub mod engine;
pub mod portfolio;
pub mod strategy;
