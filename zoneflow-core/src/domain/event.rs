//! Inbound feed event.

use serde::{Deserialize, Serialize};

/// A single price update from the market data feed.
///
/// Either a trade tick or a kline update. `is_final_for_interval` marks the
/// event that closes the current candle (the exchange's "kline closed" flag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    /// Exchange epoch milliseconds.
    pub event_time: i64,
    #[serde(default)]
    pub is_final_for_interval: bool,
}

impl PriceEvent {
    pub fn tick(symbol: impl Into<String>, price: f64, volume: f64, event_time: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            event_time,
            is_final_for_interval: false,
        }
    }

    /// Mark this event as the last one of its interval.
    pub fn closing(mut self) -> Self {
        self.is_final_for_interval = true;
        self
    }

    pub fn has_valid_values(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.volume.is_finite() && self.volume >= 0.0
    }
}
