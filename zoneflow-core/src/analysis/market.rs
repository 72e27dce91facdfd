//! Market metrics computed from the candle tail: momentum, volatility, volume.

use crate::domain::Candle;
use serde::{Deserialize, Serialize};

/// Directional momentum over `window` candles: `(c[n-1] - c[n-1-w]) / c[n-1-w]`.
///
/// Returns `None` when there are not enough candles.
pub fn momentum(candles: &[Candle], window: usize) -> Option<f64> {
    let n = candles.len();
    if window == 0 || n <= window {
        return None;
    }
    let then = candles[n - 1 - window].close;
    let now = candles[n - 1].close;
    if then <= 0.0 {
        return None;
    }
    Some((now - then) / then)
}

/// Population standard deviation of the last `window` close-to-close returns.
pub fn volatility(candles: &[Candle], window: usize) -> Option<f64> {
    let n = candles.len();
    if window == 0 || n <= window {
        return None;
    }
    let tail = &candles[n - 1 - window..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect();
    if returns.is_empty() {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    Some(var.sqrt())
}

/// Mean volume of up to `lookback` candles preceding the last one.
pub fn average_volume(candles: &[Candle], lookback: usize) -> Option<f64> {
    let n = candles.len();
    if n < 2 || lookback == 0 {
        return None;
    }
    let start = (n - 1).saturating_sub(lookback);
    let prior = &candles[start..n - 1];
    Some(prior.iter().map(|c| c.volume).sum::<f64>() / prior.len() as f64)
}

/// Metrics for one evaluation snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub momentum: f64,
    pub volatility: f64,
    /// Average volume preceding the current candle.
    pub average_volume: f64,
}

/// Window configuration for [`MarketSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketMetrics {
    pub momentum_window: usize,
    pub volatility_window: usize,
    pub volume_lookback: usize,
}

impl MarketMetrics {
    pub fn new(momentum_window: usize, volatility_window: usize, volume_lookback: usize) -> Self {
        Self {
            momentum_window,
            volatility_window,
            volume_lookback,
        }
    }

    /// `None` until every window is populated.
    pub fn snapshot(&self, candles: &[Candle]) -> Option<MarketSnapshot> {
        Some(MarketSnapshot {
            momentum: momentum(candles, self.momentum_window)?,
            volatility: volatility(candles, self.volatility_window)?,
            average_volume: average_volume(candles, self.volume_lookback)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes(values: &[f64]) -> Vec<Candle> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let t = i as i64 * 60_000;
                Candle::new(t, t + 59_999, c, c, c, c, 10.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn momentum_over_window() {
        let candles = closes(&[100.0, 101.0, 102.0, 104.0]);
        let m = momentum(&candles, 3).unwrap();
        assert!((m - 0.04).abs() < 1e-12);
        assert!(momentum(&candles, 4).is_none());
    }

    #[test]
    fn constant_prices_have_zero_volatility() {
        let candles = closes(&[50.0; 10]);
        assert_eq!(volatility(&candles, 5).unwrap(), 0.0);
    }

    #[test]
    fn alternating_returns_volatility() {
        // Returns +1%, -1%, ... around a mean of roughly zero.
        let mut prices = vec![100.0];
        for i in 0..8 {
            let last = *prices.last().unwrap();
            prices.push(if i % 2 == 0 { last * 1.01 } else { last / 1.01 });
        }
        let v = volatility(&closes(&prices), 8).unwrap();
        assert!(v > 0.009 && v < 0.011, "volatility {v}");
    }

    #[test]
    fn average_volume_excludes_current_candle() {
        let candles = closes(&[1.0, 1.0, 1.0, 1.0]);
        // Volumes 10, 11, 12, 13; the last one is excluded.
        assert!((average_volume(&candles, 12).unwrap() - 11.0).abs() < 1e-12);
        assert!((average_volume(&candles, 2).unwrap() - 11.5).abs() < 1e-12);
    }

    #[test]
    fn snapshot_requires_full_windows() {
        let metrics = MarketMetrics::new(10, 14, 12);
        assert!(metrics.snapshot(&closes(&[1.0; 14])).is_none());
        assert!(metrics.snapshot(&closes(&[1.0; 15])).is_some());
    }
}
