//! # Candlelab Runner
//!
//! Batch execution layer on top of the core engine.
//!
//! ## Components
//!
//! - `RunConfig`: TOML configuration for a single backtest
//! - `Runner`: wires the store, driver, and metrics into one call
//! - `PerformanceMetrics`: post-run statistics from history and trades
//! - `RunId`: content hash of the configuration for artifact layout
//! - `ArtifactWriter`: config.json / trades.csv / portfolio.csv / metrics.json
//! - `synthetic`: deterministic random-walk bars and day-file fixtures

pub mod config;
pub mod fingerprint;
pub mod metrics;
pub mod reporting;
pub mod runner;
pub mod synthetic;

pub use config::{RunConfig, RunConfigError};
pub use fingerprint::RunId;
pub use metrics::PerformanceMetrics;
pub use reporting::{ArtifactPaths, ArtifactWriter};
pub use runner::{RunOutcome, Runner};
