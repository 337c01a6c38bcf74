//! Order — a single market-style execution request and its outcome.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// Why an order was not executed. Rejections are counted, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    InsufficientCash { required: f64, available: f64 },
    ZeroQuantity,
    InvalidPrice,
    /// Open requested against a position on the other side.
    OppositeExposure,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientCash {
                required,
                available,
            } => write!(
                f,
                "insufficient cash: required {required:.2}, available {available:.2}"
            ),
            RejectReason::ZeroQuantity => write!(f, "quantity is zero"),
            RejectReason::InvalidPrice => write!(f, "price is not positive and finite"),
            RejectReason::OppositeExposure => {
                write!(f, "symbol holds exposure on the opposite side")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected(RejectReason),
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// Order record.
///
/// Created `Pending` and finalized within the same simulation step. Once
/// terminal (filled or rejected) it is never mutated again; `fill` and
/// `reject` consume the pending order to enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub requested_quantity: f64,
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub filled_price: f64,
    pub commission: f64,
    pub slippage: f64,
}

impl Order {
    pub fn pending(
        id: OrderId,
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        side: OrderSide,
        requested_quantity: f64,
    ) -> Self {
        Self {
            id,
            timestamp,
            symbol: symbol.into(),
            side,
            requested_quantity,
            status: OrderStatus::Pending,
            filled_quantity: 0.0,
            filled_price: 0.0,
            commission: 0.0,
            slippage: 0.0,
        }
    }

    pub fn fill(mut self, price: f64, commission: f64, slippage: f64) -> Self {
        debug_assert!(!self.status.is_terminal(), "order {} already final", self.id);
        self.status = OrderStatus::Filled;
        self.filled_quantity = self.requested_quantity;
        self.filled_price = price;
        self.commission = commission;
        self.slippage = slippage;
        self
    }

    pub fn reject(mut self, reason: RejectReason) -> Self {
        debug_assert!(!self.status.is_terminal(), "order {} already final", self.id);
        self.status = OrderStatus::Rejected(reason);
        self
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, OrderStatus::Rejected(_))
    }

    /// Gross notional of the fill (0 unless filled).
    pub fn notional(&self) -> f64 {
        self.filled_quantity * self.filled_price
    }
}
