//! Backtest run configuration with construction-time validation.

use crate::constants::{DEFAULT_MAINTENANCE_MARGIN_RATE, DEFAULT_TAKER_FEE_RATE, PRICE_EPSILON};
use crate::domain::{Symbol, Timeframe, TradingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("spot mode requires max_leverage = 1, got {0}")]
    SpotLeverage(f64),

    #[error("futures max_leverage must be within [1, {max}], got {got}")]
    LeverageOutOfRange { got: f64, max: f64 },

    #[error("maintenance margin rate must be within (0, 1), got {0}")]
    InvalidMarginRate(f64),

    #[error("taker fee rate must be finite and within [0, 1), got {0}")]
    InvalidFeeRate(f64),
}

/// Parameters for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: f64,
    pub trading_mode: TradingMode,
    pub max_leverage: f64,
    #[serde(default = "default_maintenance_margin_rate")]
    pub maintenance_margin_rate: f64,
    #[serde(default = "default_taker_fee_rate")]
    pub taker_fee_rate: f64,
}

fn default_maintenance_margin_rate() -> f64 {
    DEFAULT_MAINTENANCE_MARGIN_RATE
}

fn default_taker_fee_rate() -> f64 {
    DEFAULT_TAKER_FEE_RATE
}

impl BacktestConfig {
    /// Build a validated config; invalid values are rejected immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initial_capital: f64,
        trading_mode: TradingMode,
        max_leverage: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            symbol,
            timeframe,
            start,
            end,
            initial_capital,
            trading_mode,
            max_leverage,
            maintenance_margin_rate: DEFAULT_MAINTENANCE_MARGIN_RATE,
            taker_fee_rate: DEFAULT_TAKER_FEE_RATE,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_maintenance_margin_rate(mut self, rate: f64) -> Result<Self, ConfigError> {
        self.maintenance_margin_rate = rate;
        self.validate()?;
        Ok(self)
    }

    pub fn with_taker_fee_rate(mut self, rate: f64) -> Result<Self, ConfigError> {
        self.taker_fee_rate = rate;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        match self.trading_mode {
            TradingMode::Spot => {
                if (self.max_leverage - 1.0).abs() > PRICE_EPSILON {
                    return Err(ConfigError::SpotLeverage(self.max_leverage));
                }
            }
            TradingMode::Futures => {
                let cap = self.trading_mode.max_leverage();
                if !self.max_leverage.is_finite()
                    || self.max_leverage < 1.0
                    || self.max_leverage > cap
                {
                    return Err(ConfigError::LeverageOutOfRange {
                        got: self.max_leverage,
                        max: cap,
                    });
                }
            }
        }
        if !self.maintenance_margin_rate.is_finite()
            || self.maintenance_margin_rate <= 0.0
            || self.maintenance_margin_rate >= 1.0
        {
            return Err(ConfigError::InvalidMarginRate(self.maintenance_margin_rate));
        }
        if !self.taker_fee_rate.is_finite()
            || self.taker_fee_rate < 0.0
            || self.taker_fee_rate >= 1.0
        {
            return Err(ConfigError::InvalidFeeRate(self.taker_fee_rate));
        }
        Ok(())
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dates() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn valid_futures_config() {
        let (start, end) = dates();
        let config = BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            start,
            end,
            10_000.0,
            TradingMode::Futures,
            10.0,
        )
        .unwrap();
        assert_eq!(config.maintenance_margin_rate, 0.005);
        assert_eq!(config.taker_fee_rate, 0.001);
        assert_eq!(config.duration_days(), 30);
    }

    #[test]
    fn reversed_dates_rejected() {
        let (start, end) = dates();
        let result = BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            end,
            start,
            10_000.0,
            TradingMode::Futures,
            10.0,
        );
        assert!(matches!(result, Err(ConfigError::InvalidDateRange { .. })));
    }

    #[test]
    fn spot_requires_unit_leverage() {
        let (start, end) = dates();
        let result = BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            start,
            end,
            10_000.0,
            TradingMode::Spot,
            2.0,
        );
        assert!(matches!(result, Err(ConfigError::SpotLeverage(_))));
    }

    #[test]
    fn futures_leverage_capped_at_100() {
        let (start, end) = dates();
        let result = BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            start,
            end,
            10_000.0,
            TradingMode::Futures,
            150.0,
        );
        assert!(matches!(
            result,
            Err(ConfigError::LeverageOutOfRange { .. })
        ));
    }

    #[test]
    fn non_positive_capital_rejected() {
        let (start, end) = dates();
        for capital in [0.0, -1000.0, f64::NAN] {
            let result = BacktestConfig::new(
                Symbol::BtcUsdt,
                Timeframe::H1,
                start,
                end,
                capital,
                TradingMode::Spot,
                1.0,
            );
            assert!(matches!(result, Err(ConfigError::InvalidCapital(_))));
        }
    }

    #[test]
    fn margin_rate_bounds() {
        let (start, end) = dates();
        let base = BacktestConfig::new(
            Symbol::BtcUsdt,
            Timeframe::H1,
            start,
            end,
            10_000.0,
            TradingMode::Futures,
            10.0,
        )
        .unwrap();
        assert!(base.clone().with_maintenance_margin_rate(0.0).is_err());
        assert!(base.clone().with_maintenance_margin_rate(1.0).is_err());
        assert!(base.with_maintenance_margin_rate(0.05).is_ok());
    }

    #[test]
    fn json_round_trip() {
        let (start, end) = dates();
        let config = BacktestConfig::new(
            Symbol::EthUsdt,
            Timeframe::M5,
            start,
            end,
            5_000.0,
            TradingMode::Spot,
            1.0,
        )
        .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"ETHUSDT\""));
        assert!(json.contains("\"spot\""));
        let back: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
