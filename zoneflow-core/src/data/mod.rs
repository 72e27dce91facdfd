//! Market data intake: the bounded candle buffer and the tick aggregator.

pub mod aggregator;
pub mod buffer;

pub use aggregator::{AggregatorStats, CandleAggregator, DropReason, IngestOutcome};
pub use buffer::{Admission, CandleBuffer};
