//! Market enumerations: symbols, timeframes, trading modes, sides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Seconds in the crypto trading year (24/7, 365 days).
const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("unsupported symbol: {0}")]
    UnknownSymbol(String),

    #[error("unsupported timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("unsupported trading mode: {0}")]
    UnknownTradingMode(String),
}

/// Supported trading pairs, Binance naming convention (base + USDT quote).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "BTCUSDT")]
    BtcUsdt,
    #[serde(rename = "ETHUSDT")]
    EthUsdt,
    #[serde(rename = "SOLUSDT")]
    SolUsdt,
}

impl Symbol {
    /// Exchange pair name, also the on-disk directory component.
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::BtcUsdt => "BTCUSDT",
            Symbol::EthUsdt => "ETHUSDT",
            Symbol::SolUsdt => "SOLUSDT",
        }
    }

    pub fn base_asset(&self) -> &'static str {
        match self {
            Symbol::BtcUsdt => "BTC",
            Symbol::EthUsdt => "ETH",
            Symbol::SolUsdt => "SOL",
        }
    }

    pub fn quote_asset(&self) -> &'static str {
        "USDT"
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = MarketError;

    /// Accepts the full pair ("BTCUSDT") or the base asset ("btc").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" | "BTCUSDT" => Ok(Symbol::BtcUsdt),
            "ETH" | "ETHUSDT" => Ok(Symbol::EthUsdt),
            "SOL" | "SOLUSDT" => Ok(Symbol::SolUsdt),
            _ => Err(MarketError::UnknownSymbol(s.to_string())),
        }
    }
}

/// Candlestick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1_800,
            Timeframe::H1 => 3_600,
            Timeframe::H4 => 14_400,
            Timeframe::D1 => 86_400,
            Timeframe::W1 => 604_800,
        }
    }

    /// Bars in a 365-day crypto year, the annualization base for
    /// Sharpe/Sortino scaling.
    pub fn bars_per_year(&self) -> f64 {
        SECONDS_PER_YEAR / self.seconds() as f64
    }

    pub fn is_intraday(&self) -> bool {
        self.seconds() < 86_400
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            _ => Err(MarketError::UnknownTimeframe(s.to_string())),
        }
    }
}

/// Trading mode, which decides margin arithmetic and capability limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Full notional paid in cash; no leverage, no shorts, no liquidation.
    Spot,
    /// Margined perpetual futures; leverage, shorts, and liquidation.
    Futures,
}

impl TradingMode {
    /// On-disk market directory component.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Spot => "spot",
            TradingMode::Futures => "futures",
        }
    }

    pub fn max_leverage(&self) -> f64 {
        match self {
            TradingMode::Spot => 1.0,
            TradingMode::Futures => 100.0,
        }
    }

    pub fn allows_short(&self) -> bool {
        matches!(self, TradingMode::Futures)
    }

    pub fn has_liquidation(&self) -> bool {
        matches!(self, TradingMode::Futures)
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradingMode {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spot" => Ok(TradingMode::Spot),
            "futures" => Ok(TradingMode::Futures),
            _ => Err(MarketError::UnknownTradingMode(s.to_string())),
        }
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn opposite(&self) -> PositionSide {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

/// Kind of executed trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    /// Forced close by the risk engine.
    Liquidation,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Liquidation => "liquidation",
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, TradeAction::Liquidation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_parsing_accepts_both_forms() {
        assert_eq!("btc".parse::<Symbol>().unwrap(), Symbol::BtcUsdt);
        assert_eq!("ETHUSDT".parse::<Symbol>().unwrap(), Symbol::EthUsdt);
        assert!("DOGEUSDT".parse::<Symbol>().is_err());
    }

    #[test]
    fn symbol_assets() {
        assert_eq!(Symbol::BtcUsdt.base_asset(), "BTC");
        assert_eq!(Symbol::BtcUsdt.quote_asset(), "USDT");
        assert_eq!(Symbol::SolUsdt.to_string(), "SOLUSDT");
    }

    #[test]
    fn timeframe_seconds() {
        assert_eq!(Timeframe::M1.seconds(), 60);
        assert_eq!(Timeframe::H4.seconds(), 14_400);
        assert_eq!(Timeframe::W1.seconds(), 604_800);
    }

    #[test]
    fn timeframe_round_trip() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
            Timeframe::W1,
        ] {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn bars_per_year_crypto_calendar() {
        assert_eq!(Timeframe::D1.bars_per_year(), 365.0);
        assert_eq!(Timeframe::H1.bars_per_year(), 365.0 * 24.0);
        assert_eq!(Timeframe::M1.bars_per_year(), 525_600.0);
    }

    #[test]
    fn mode_capabilities() {
        assert!(!TradingMode::Spot.allows_short());
        assert!(!TradingMode::Spot.has_liquidation());
        assert_eq!(TradingMode::Spot.max_leverage(), 1.0);
        assert!(TradingMode::Futures.allows_short());
        assert_eq!(TradingMode::Futures.max_leverage(), 100.0);
    }

    #[test]
    fn side_opposite() {
        assert_eq!(PositionSide::Long.opposite(), PositionSide::Short);
        assert_eq!(PositionSide::Short.opposite(), PositionSide::Long);
    }
}
