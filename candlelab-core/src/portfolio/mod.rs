//! Portfolio engine: shared state behind one lock, order execution, risk
//! scanning, and read-only valuation.
//!
//! `PortfolioCore` owns the mutable state. `OrderEngine`, `RiskEngine`, and
//! `PortfolioMetrics` each hold a non-owning handle to the same core and go
//! through its lock; every public operation locks exactly once and internal
//! helpers work on `&mut PortfolioState`, so no operation ever re-locks.

pub mod metrics;
pub mod orders;
pub mod risk;
pub mod state;

pub use metrics::PortfolioMetrics;
pub use orders::{ExecutionParams, OrderEngine, OrderError};
pub use risk::RiskEngine;
pub use state::{MarkPrices, PortfolioCore, PortfolioState};
