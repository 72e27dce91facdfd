//! Candle aggregation from a tick/kline stream.
//!
//! Events are bucketed into fixed intervals aligned to the epoch:
//! `open_time = t - t mod interval`, `close_time = open_time + interval - 1`.
//! The in-progress candle is finalized when an event from a later interval
//! arrives or when an event carries `is_final_for_interval`.
//!
//! Anything that would break the buffer's ordering (replayed candles,
//! stale events, foreign symbols, garbage prices) is dropped with a warning
//! and leaves all state untouched.

use super::buffer::{Admission, CandleBuffer};
use crate::domain::{Candle, PriceEvent};
use tracing::{debug, warn};

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Its interval is already closed and present in the buffer.
    Duplicate,
    /// Older than the newest closed candle or the last event folded in.
    OutOfOrder,
    /// Non-finite or non-positive price, or negative volume.
    InvalidPrice,
    ForeignSymbol,
}

/// What happened to one ingested event.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Folded into the in-progress candle.
    Updated,
    /// Closed one or more candles, oldest first. Each is now in the buffer.
    Closed(Vec<Candle>),
    Dropped(DropReason),
}

impl IngestOutcome {
    /// The newest candle closed by this event, if any.
    pub fn closed_candle(&self) -> Option<&Candle> {
        match self {
            IngestOutcome::Closed(candles) => candles.last(),
            _ => None,
        }
    }
}

/// Data-quality counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub closed: u64,
    pub duplicates: u64,
    pub out_of_order: u64,
    pub invalid: u64,
}

#[derive(Debug, Clone)]
pub struct CandleAggregator {
    symbol: String,
    interval_ms: i64,
    buffer: CandleBuffer,
    in_progress: Option<Candle>,
    last_event_time: Option<i64>,
    stats: AggregatorStats,
}

impl CandleAggregator {
    pub fn new(symbol: impl Into<String>, interval_ms: i64, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            interval_ms: interval_ms.max(1),
            buffer: CandleBuffer::new(capacity),
            in_progress: None,
            last_event_time: None,
            stats: AggregatorStats::default(),
        }
    }

    /// Fold one feed event into the candle stream.
    pub fn ingest(&mut self, event: &PriceEvent) -> IngestOutcome {
        if !event.symbol.eq_ignore_ascii_case(&self.symbol) {
            warn!(
                expected = %self.symbol,
                got = %event.symbol,
                "dropping event for foreign symbol"
            );
            return self.drop_event(DropReason::ForeignSymbol);
        }
        if !event.has_valid_values() {
            warn!(
                symbol = %self.symbol,
                price = event.price,
                volume = event.volume,
                "dropping event with invalid price or volume"
            );
            return self.drop_event(DropReason::InvalidPrice);
        }

        let (open_time, close_time) = self.bucket(event.event_time);

        if let Some(newest) = self.buffer.newest() {
            if close_time <= newest.close_time {
                let reason = if self.buffer.contains(close_time) {
                    DropReason::Duplicate
                } else {
                    DropReason::OutOfOrder
                };
                warn!(
                    symbol = %self.symbol,
                    event_time = event.event_time,
                    close_time,
                    newest_close = newest.close_time,
                    ?reason,
                    "dropping event for an already-closed interval"
                );
                return self.drop_event(reason);
            }
        }

        let mut closed = Vec::new();
        match self.in_progress {
            Some(current) if close_time < current.close_time => {
                warn!(
                    symbol = %self.symbol,
                    event_time = event.event_time,
                    open_interval_close = current.close_time,
                    "dropping event older than the open interval"
                );
                return self.drop_event(DropReason::OutOfOrder);
            }
            Some(current) if close_time == current.close_time => {
                if self.last_event_time.is_some_and(|last| event.event_time < last) {
                    warn!(
                        symbol = %self.symbol,
                        event_time = event.event_time,
                        "dropping out-of-order event within the open interval"
                    );
                    return self.drop_event(DropReason::OutOfOrder);
                }
                let mut updated = current;
                updated.high = updated.high.max(event.price);
                updated.low = updated.low.min(event.price);
                updated.close = event.price;
                updated.volume += event.volume;
                self.in_progress = Some(updated);
            }
            Some(_) => {
                if let Some(candle) = self.finalize() {
                    closed.push(candle);
                }
                self.in_progress = Some(self.open_candle(open_time, close_time, event));
            }
            None => {
                self.in_progress = Some(self.open_candle(open_time, close_time, event));
            }
        }
        self.last_event_time = Some(event.event_time);

        if event.is_final_for_interval {
            if let Some(candle) = self.finalize() {
                closed.push(candle);
            }
        }

        if closed.is_empty() {
            IngestOutcome::Updated
        } else {
            IngestOutcome::Closed(closed)
        }
    }

    /// Admit an already-closed candle (historical replay or REST backfill).
    ///
    /// Subject to the same deduplication and ordering rules as live events.
    /// A partial in-progress candle for an earlier interval is closed as it
    /// stands first; one for the same interval is superseded.
    pub fn ingest_candle(&mut self, candle: Candle) -> IngestOutcome {
        if let Err(e) = candle.validate() {
            warn!(symbol = %self.symbol, error = %e, "dropping invalid candle");
            return self.drop_event(DropReason::InvalidPrice);
        }
        let mut closed = Vec::new();
        if self
            .in_progress
            .is_some_and(|partial| partial.close_time < candle.open_time)
        {
            if let Some(partial) = self.finalize() {
                warn!(
                    symbol = %self.symbol,
                    close_time = partial.close_time,
                    "closing partial candle ahead of a later historical candle"
                );
                closed.push(partial);
            }
        }
        match self.buffer.push(candle) {
            Admission::Appended { evicted } => {
                if let Some(old) = evicted {
                    debug!(symbol = %self.symbol, close_time = old.close_time, "evicted candle");
                }
                if self
                    .in_progress
                    .is_some_and(|c| c.close_time <= candle.close_time)
                {
                    self.in_progress = None;
                    debug!(
                        symbol = %self.symbol,
                        close_time = candle.close_time,
                        "partial candle superseded by historical candle"
                    );
                }
                self.last_event_time = Some(self.last_event_time.unwrap_or(i64::MIN).max(candle.close_time));
                self.stats.closed += 1;
                closed.push(candle);
                IngestOutcome::Closed(closed)
            }
            Admission::Duplicate => {
                warn!(symbol = %self.symbol, close_time = candle.close_time, "dropping duplicate candle");
                self.drop_event(DropReason::Duplicate)
            }
            Admission::OutOfOrder => {
                warn!(symbol = %self.symbol, close_time = candle.close_time, "dropping out-of-order candle");
                self.drop_event(DropReason::OutOfOrder)
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn buffer(&self) -> &CandleBuffer {
        &self.buffer
    }

    pub fn candles(&self) -> &[Candle] {
        self.buffer.as_slice()
    }

    pub fn in_progress(&self) -> Option<&Candle> {
        self.in_progress.as_ref()
    }

    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    fn bucket(&self, event_time: i64) -> (i64, i64) {
        let open_time = event_time - event_time.rem_euclid(self.interval_ms);
        (open_time, open_time + self.interval_ms - 1)
    }

    fn open_candle(&self, open_time: i64, close_time: i64, event: &PriceEvent) -> Candle {
        Candle::new(
            open_time,
            close_time,
            event.price,
            event.price,
            event.price,
            event.price,
            event.volume,
        )
    }

    fn finalize(&mut self) -> Option<Candle> {
        let candle = self.in_progress.take()?;
        match self.buffer.push(candle) {
            Admission::Appended { evicted } => {
                if let Some(old) = evicted {
                    debug!(symbol = %self.symbol, close_time = old.close_time, "evicted candle");
                }
                self.stats.closed += 1;
                debug!(
                    symbol = %self.symbol,
                    close_time = candle.close_time,
                    close = candle.close,
                    "candle closed"
                );
                Some(candle)
            }
            // Unreachable while ingest checks the buffer first.
            Admission::Duplicate | Admission::OutOfOrder => None,
        }
    }

    fn drop_event(&mut self, reason: DropReason) -> IngestOutcome {
        match reason {
            DropReason::Duplicate => self.stats.duplicates += 1,
            DropReason::OutOfOrder => self.stats.out_of_order += 1,
            DropReason::InvalidPrice | DropReason::ForeignSymbol => self.stats.invalid += 1,
        }
        IngestOutcome::Dropped(reason)
    }
}
