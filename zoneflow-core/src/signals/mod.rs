//! Signal generation: multi-factor scoring and the strategy variants.
//!
//! Signals depend only on the candle snapshot. Account state enters later, in
//! the risk sizer.

pub mod scorer;
pub mod strategy;

pub use scorer::{DirectionScore, Signal, SignalFactors, SignalScorer};
pub use strategy::{Evaluation, Strategy};
