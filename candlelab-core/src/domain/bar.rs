use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Single OHLCV bar at millisecond timestamp granularity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }

    /// Validate bar invariants.
    pub fn validate(&self) -> Result<(), BarError> {
        for value in [self.open, self.high, self.low, self.close, self.volume] {
            if !value.is_finite() {
                return Err(BarError::NonFinite);
            }
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarError::NonPositivePrice);
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume);
        }
        if self.high < self.low {
            return Err(BarError::InvalidRange { high: self.high, low: self.low });
        }
        if !(self.low..=self.high).contains(&self.open) {
            return Err(BarError::OpenOutOfRange);
        }
        if !(self.low..=self.high).contains(&self.close) {
            return Err(BarError::CloseOutOfRange);
        }
        Ok(())
    }

    /// Milliseconds since the Unix epoch, the on-disk timestamp unit.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Check if the bar closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Bar range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Error)]
pub enum BarError {
    #[error("bar contains a non-finite value")]
    NonFinite,

    #[error("bar prices must be positive")]
    NonPositivePrice,

    #[error("negative volume not allowed")]
    NegativeVolume,

    #[error("invalid bar range: high={high}, low={low}")]
    InvalidRange { high: f64, low: f64 },

    #[error("open price outside high/low range")]
    OpenOutOfRange,

    #[error("close price outside high/low range")]
    CloseOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn valid_bar_passes() {
        let bar = Bar::new(ts(), 100.0, 105.0, 95.0, 102.0, 1000.0);
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        let bar = Bar::new(ts(), 100.0, 99.0, 101.0, 100.0, 1000.0);
        assert!(matches!(bar.validate(), Err(BarError::InvalidRange { .. })));
    }

    #[test]
    fn close_outside_range_rejected() {
        let bar = Bar::new(ts(), 100.0, 105.0, 95.0, 110.0, 1000.0);
        assert!(matches!(bar.validate(), Err(BarError::CloseOutOfRange)));
    }

    #[test]
    fn open_outside_range_rejected() {
        let bar = Bar::new(ts(), 90.0, 105.0, 95.0, 100.0, 1000.0);
        assert!(matches!(bar.validate(), Err(BarError::OpenOutOfRange)));
    }

    #[test]
    fn negative_volume_rejected() {
        let bar = Bar::new(ts(), 100.0, 105.0, 95.0, 102.0, -1.0);
        assert!(matches!(bar.validate(), Err(BarError::NegativeVolume)));
    }

    #[test]
    fn nan_rejected() {
        let bar = Bar::new(ts(), f64::NAN, 105.0, 95.0, 102.0, 1.0);
        assert!(matches!(bar.validate(), Err(BarError::NonFinite)));
    }

    #[test]
    fn timestamp_millis_round_trip() {
        let bar = Bar::new(ts(), 100.0, 105.0, 95.0, 102.0, 1.0);
        assert_eq!(bar.timestamp_ms(), 1_735_689_600_000);
    }
}
