//! TOML run configuration: the file format the CLI consumes.

use candlelab_core::config::{BacktestConfig, ConfigError};
use candlelab_core::data::StoreConfig;
use candlelab_core::domain::{Symbol, Timeframe, TradingMode};
use candlelab_core::strategy::examples::{BuyAndHold, SmaCrossover};
use candlelab_core::strategy::Strategy;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error(transparent)]
    Backtest(#[from] ConfigError),

    #[error("unknown strategy type: {0}")]
    UnknownStrategy(String),
}

/// Top-level run configuration from a TOML file.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
    pub strategy: StrategySection,
}

/// General backtest parameters.
#[derive(Debug, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_trading_mode")]
    pub trading_mode: String,
    #[serde(default = "default_max_leverage")]
    pub max_leverage: f64,
    pub maintenance_margin_rate: Option<f64>,
    pub taker_fee_rate: Option<f64>,
}

/// Data-layer parameters.
#[derive(Debug, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_data_root")]
    pub root: String,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: usize,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            root: default_data_root(),
            cache_capacity: default_cache_capacity(),
            memory_limit_mb: default_memory_limit_mb(),
        }
    }
}

/// Strategy selection: a type name plus numeric parameters.
#[derive(Debug, Deserialize)]
pub struct StrategySection {
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

fn default_capital() -> f64 {
    10_000.0
}
fn default_trading_mode() -> String {
    "spot".to_string()
}
fn default_max_leverage() -> f64 {
    1.0
}
fn default_data_root() -> String {
    "data".to_string()
}
fn default_cache_capacity() -> usize {
    100
}
fn default_memory_limit_mb() -> usize {
    512
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| RunConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, RunConfigError> {
        toml::from_str(toml_str).map_err(|e| RunConfigError::Parse(e.to_string()))
    }

    /// Build the validated core config. `start_date`/`end_date` are whole
    /// UTC days; the end day is included through 23:59:59.
    pub fn to_backtest_config(&self) -> Result<BacktestConfig, RunConfigError> {
        let symbol: Symbol = self.backtest.symbol.parse().map_err(invalid("symbol"))?;
        let timeframe: Timeframe = self
            .backtest
            .timeframe
            .parse()
            .map_err(invalid("timeframe"))?;
        let trading_mode: TradingMode = self
            .backtest
            .trading_mode
            .parse()
            .map_err(invalid("trading_mode"))?;
        let start = parse_day_start(&self.backtest.start_date)?;
        let end = parse_day_end(&self.backtest.end_date)?;

        let mut config = BacktestConfig::new(
            symbol,
            timeframe,
            start,
            end,
            self.backtest.initial_capital,
            trading_mode,
            self.backtest.max_leverage,
        )?;
        if let Some(rate) = self.backtest.maintenance_margin_rate {
            config = config.with_maintenance_margin_rate(rate)?;
        }
        if let Some(rate) = self.backtest.taker_fee_rate {
            config = config.with_taker_fee_rate(rate)?;
        }
        Ok(config)
    }

    /// Store configuration for the data section.
    pub fn store_config(&self, mode: TradingMode) -> StoreConfig {
        StoreConfig::new(&self.data.root, mode)
            .with_cache_capacity(self.data.cache_capacity)
            .with_memory_limit(self.data.memory_limit_mb * 1024 * 1024)
    }

    /// Instantiate the named example strategy.
    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>, RunConfigError> {
        let params = &self.strategy.params;
        let param = |name: &str, default: f64| params.get(name).copied().unwrap_or(default);
        match self.strategy.strategy_type.as_str() {
            "buy_and_hold" => Ok(Box::new(BuyAndHold::new(
                param("amount", 1.0),
                param("leverage", 1.0),
            ))),
            "sma_crossover" => Ok(Box::new(SmaCrossover::new(
                param("fast_period", 10.0) as usize,
                param("slow_period", 30.0) as usize,
                param("amount", 1.0),
                param("leverage", 1.0),
            ))),
            other => Err(RunConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

fn invalid<E: std::fmt::Display>(field: &'static str) -> impl Fn(E) -> RunConfigError {
    move |e| RunConfigError::Invalid {
        field,
        message: e.to_string(),
    }
}

fn parse_day_start(day: &str) -> Result<chrono::DateTime<chrono::Utc>, RunConfigError> {
    let date: NaiveDate = day.parse().map_err(invalid("start_date"))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn parse_day_end(day: &str) -> Result<chrono::DateTime<chrono::Utc>, RunConfigError> {
    let date: NaiveDate = day.parse().map_err(invalid("end_date"))?;
    Ok(date.and_hms_opt(23, 59, 59).unwrap().and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TOML: &str = r#"
[backtest]
symbol = "BTCUSDT"
timeframe = "1h"
start_date = "2025-01-01"
end_date = "2025-01-31"
initial_capital = 50000.0
trading_mode = "futures"
max_leverage = 10.0
maintenance_margin_rate = 0.01
taker_fee_rate = 0.0005

[data]
root = "/srv/market-data"
cache_capacity = 50
memory_limit_mb = 256

[strategy]
type = "sma_crossover"
params = { fast_period = 5.0, slow_period = 20.0, amount = 0.5, leverage = 3.0 }
"#;

    const MINIMAL_TOML: &str = r#"
[backtest]
symbol = "ETHUSDT"
timeframe = "1d"
start_date = "2025-01-01"
end_date = "2025-06-30"

[strategy]
type = "buy_and_hold"
"#;

    #[test]
    fn parse_full_config() {
        let run = RunConfig::from_toml(FULL_TOML).unwrap();
        let config = run.to_backtest_config().unwrap();
        assert_eq!(config.symbol, Symbol::BtcUsdt);
        assert_eq!(config.timeframe, Timeframe::H1);
        assert_eq!(config.trading_mode, TradingMode::Futures);
        assert_eq!(config.initial_capital, 50_000.0);
        assert_eq!(config.max_leverage, 10.0);
        assert_eq!(config.maintenance_margin_rate, 0.01);
        assert_eq!(config.taker_fee_rate, 0.0005);
        assert_eq!(config.start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(config.end.to_rfc3339(), "2025-01-31T23:59:59+00:00");

        assert_eq!(run.data.root, "/srv/market-data");
        assert_eq!(run.data.cache_capacity, 50);
        assert!(run.build_strategy().is_ok());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let run = RunConfig::from_toml(MINIMAL_TOML).unwrap();
        let config = run.to_backtest_config().unwrap();
        assert_eq!(config.trading_mode, TradingMode::Spot);
        assert_eq!(config.initial_capital, 10_000.0);
        assert_eq!(config.max_leverage, 1.0);
        assert_eq!(config.maintenance_margin_rate, 0.005);
        assert_eq!(config.taker_fee_rate, 0.001);
        assert_eq!(run.data.root, "data");
        assert_eq!(run.data.memory_limit_mb, 512);
    }

    #[test]
    fn bad_symbol_is_field_error() {
        let toml = MINIMAL_TOML.replace("ETHUSDT", "DOGEUSDT");
        let run = RunConfig::from_toml(&toml).unwrap();
        let err = run.to_backtest_config().unwrap_err();
        assert!(matches!(
            err,
            RunConfigError::Invalid { field: "symbol", .. }
        ));
    }

    #[test]
    fn leverage_validation_flows_through() {
        let toml = FULL_TOML.replace("max_leverage = 10.0", "max_leverage = 500.0");
        let run = RunConfig::from_toml(&toml).unwrap();
        assert!(matches!(
            run.to_backtest_config(),
            Err(RunConfigError::Backtest(_))
        ));
    }

    #[test]
    fn unknown_strategy_rejected() {
        let toml = MINIMAL_TOML.replace("buy_and_hold", "teleportation");
        let run = RunConfig::from_toml(&toml).unwrap();
        assert!(matches!(
            run.build_strategy(),
            Err(RunConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        assert!(matches!(
            RunConfig::from_toml("not [valid toml!!"),
            Err(RunConfigError::Parse(_))
        ));
    }
}
