//! Domain types shared by every pipeline stage.

pub mod account;
pub mod candle;
pub mod direction;
pub mod event;
pub mod ids;
pub mod plan;
pub mod trade;

pub use account::{AccountState, InstrumentConstraints};
pub use candle::{Candle, CandleError};
pub use direction::Direction;
pub use event::PriceEvent;
pub use ids::PositionId;
pub use plan::PositionPlan;
pub use trade::{ExitReason, TradeRecord};
