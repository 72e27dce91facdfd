//! CandleBuffer — bounded, strictly ordered window of closed candles.

use crate::domain::Candle;

/// Result of offering a candle to the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Appended; carries the candle evicted to make room, if any.
    Appended { evicted: Option<Candle> },
    /// A candle with this close_time is already present.
    Duplicate,
    /// Older than the newest candle but not present.
    OutOfOrder,
}

/// Fixed-capacity FIFO of closed candles.
///
/// Invariants: `len() <= capacity()` and close times are strictly increasing.
/// Every mutation goes through [`CandleBuffer::push`], which enforces both.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    candles: Vec<Candle>,
    capacity: usize,
}

impl CandleBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, candle: Candle) -> Admission {
        if let Some(newest) = self.candles.last() {
            if candle.close_time <= newest.close_time {
                return if self.contains(candle.close_time) {
                    Admission::Duplicate
                } else {
                    Admission::OutOfOrder
                };
            }
        }

        let evicted = if self.candles.len() == self.capacity {
            Some(self.candles.remove(0))
        } else {
            None
        };
        self.candles.push(candle);
        Admission::Appended { evicted }
    }

    pub fn contains(&self, close_time: i64) -> bool {
        self.candles
            .binary_search_by_key(&close_time, |c| c.close_time)
            .is_ok()
    }

    pub fn newest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.candles.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
