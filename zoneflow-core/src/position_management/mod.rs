/// Position management: trailing stops under the ratchet invariant.
///
/// **Key Design Principles:**
/// 1. Stops may tighten, never loosen
/// 2. The tracker only reports stop updates; executing them is the venue's job
///
/// **Module Structure:**
/// - `ratchet`: Monotonic stop level
/// - `trailing`: Per-position trailing state keyed by position id
pub mod ratchet;
pub mod trailing;

pub use ratchet::RatchetState;
pub use trailing::{StopUpdate, TrailingPhase, TrailingState, TrailingStopTracker};
