//! Domain types for the simulation core.

pub mod bar;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use ids::{OrderId, TradeId};
pub use order::{Order, OrderSide, OrderStatus, RejectReason};
pub use portfolio::{Portfolio, ValuationRecord};
pub use position::{Position, PositionSide};
pub use trade::Trade;

/// Symbol type alias
pub type Symbol = String;
