//! Candle — one closed OHLCV interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a candle fails its OHLCV sanity check.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("candle closing at {close_time} has non-finite or non-positive prices")]
    InvalidPrice { close_time: i64 },

    #[error("candle closing at {close_time} has inconsistent OHLC (low {low}, high {high})")]
    InconsistentRange { close_time: i64, low: f64, high: f64 },

    #[error("candle closing at {close_time} has negative volume {volume}")]
    NegativeVolume { close_time: i64, volume: f64 },

    #[error("candle close_time {close_time} precedes open_time {open_time}")]
    InvertedTimes { open_time: i64, close_time: i64 },
}

/// OHLCV candle for one interval of one instrument.
///
/// Times are exchange epoch milliseconds. `close_time` is the last millisecond
/// of the interval, so consecutive candles satisfy
/// `next.open_time == prev.close_time + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        close_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// High-to-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    pub fn body_mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_high()
    }

    pub fn lower_wick(&self) -> f64 {
        self.body_low() - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body as a fraction of range. Zero for a flat candle.
    pub fn body_ratio(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            return 0.0;
        }
        self.body() / range
    }

    /// Close time as a UTC timestamp, if representable.
    pub fn close_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time)
    }

    /// Validate OHLCV consistency.
    pub fn validate(&self) -> Result<(), CandleError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(CandleError::InvalidPrice {
                close_time: self.close_time,
            });
        }
        if self.low > self.body_low() || self.high < self.body_high() {
            return Err(CandleError::InconsistentRange {
                close_time: self.close_time,
                low: self.low,
                high: self.high,
            });
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(CandleError::NegativeVolume {
                close_time: self.close_time,
                volume: self.volume,
            });
        }
        if self.close_time < self.open_time {
            return Err(CandleError::InvertedTimes {
                open_time: self.open_time,
                close_time: self.close_time,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candle {
        Candle::new(0, 299_999, 100.0, 101.0, 98.0, 100.5, 12.0)
    }

    #[test]
    fn geometry_helpers() {
        let c = sample();
        assert!((c.body() - 0.5).abs() < 1e-12);
        assert!((c.range() - 3.0).abs() < 1e-12);
        assert!((c.upper_wick() - 0.5).abs() < 1e-12);
        assert!((c.lower_wick() - 2.0).abs() < 1e-12);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn flat_candle_has_zero_body_ratio() {
        let c = Candle::new(0, 1, 5.0, 5.0, 5.0, 5.0, 0.0);
        assert_eq!(c.body_ratio(), 0.0);
        assert!(c.is_sane());
    }

    #[test]
    fn rejects_high_below_body() {
        let mut c = sample();
        c.high = 100.2;
        assert!(matches!(
            c.validate(),
            Err(CandleError::InconsistentRange { .. })
        ));
    }

    #[test]
    fn rejects_nan_and_negative_volume() {
        let mut c = sample();
        c.close = f64::NAN;
        assert!(matches!(c.validate(), Err(CandleError::InvalidPrice { .. })));

        let mut c = sample();
        c.volume = -1.0;
        assert!(matches!(
            c.validate(),
            Err(CandleError::NegativeVolume { .. })
        ));
    }

    #[test]
    fn close_datetime_converts_millis() {
        let c = Candle::new(0, 1_700_000_000_000, 1.0, 1.0, 1.0, 1.0, 0.0);
        let dt = c.close_datetime().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }
}
