//! Run identity: a content hash of the configuration.
//!
//! Equal configs hash to equal ids, which keys artifact directories and
//! makes reruns land in the same place.

use candlelab_core::config::BacktestConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

const RUN_ID_LEN: usize = 16;

/// Short hex fingerprint of a run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// BLAKE3 over the canonical JSON encoding of the config.
    pub fn from_config(config: &BacktestConfig) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_vec(config)?;
        let hash = blake3::hash(&canonical);
        Ok(Self(hash.to_hex()[..RUN_ID_LEN].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlelab_core::domain::{Symbol, Timeframe, TradingMode};
    use chrono::{TimeZone, Utc};

    fn config(capital: f64) -> BacktestConfig {
        BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(),
            capital,
            TradingMode::Futures,
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn equal_configs_equal_ids() {
        let a = RunId::from_config(&config(10_000.0)).unwrap();
        let b = RunId::from_config(&config(10_000.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), RUN_ID_LEN);
    }

    #[test]
    fn different_configs_different_ids() {
        let a = RunId::from_config(&config(10_000.0)).unwrap();
        let b = RunId::from_config(&config(20_000.0)).unwrap();
        assert_ne!(a, b);
    }
}
