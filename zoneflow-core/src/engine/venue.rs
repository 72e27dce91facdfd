//! Outbound execution interface.

use crate::domain::{PositionId, PositionPlan};
use serde::{Deserialize, Serialize};

/// Result of handing a plan to the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted { position_id: PositionId },
    Rejected { reason: String },
}

/// Where position plans go to be executed: an exchange adapter in live
/// trading, a simulator in backtests.
///
/// Entry, stop and take-profit placement are the venue's job. Once a plan is
/// accepted the caller registers the position with
/// [`SymbolPipeline::open_position`](super::SymbolPipeline::open_position).
pub trait ExecutionVenue {
    fn submit(&mut self, plan: &PositionPlan) -> SubmitOutcome;
}
