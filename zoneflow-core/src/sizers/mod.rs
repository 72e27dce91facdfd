//! Position sizing.
//!
//! The sizer is the first stage that sees account state. It never changes the
//! direction of a signal; it only decides how much, where the stop goes, or
//! that the trade must not be taken.

pub mod risk;

pub use risk::{risk_based_size, Rejection, RiskSizer};
