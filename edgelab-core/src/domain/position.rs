//! Position — signed exposure in a single symbol.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl PositionSide {
    /// +1 long, -1 short, 0 flat.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
            PositionSide::Flat => 0.0,
        }
    }
}

/// Quantities at or below this are treated as flat.
pub const QTY_EPSILON: f64 = 1e-10;

/// Position in one symbol.
///
/// `quantity` is signed: positive long, negative short, zero flat.
/// `market_value` is `quantity * last_price`, so short exposure carries a
/// negative market value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub last_price: f64,
    pub market_value: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0.0,
            avg_entry_price: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            last_price: 0.0,
            market_value: 0.0,
        }
    }

    pub fn side(&self) -> PositionSide {
        if self.quantity > QTY_EPSILON {
            PositionSide::Long
        } else if self.quantity < -QTY_EPSILON {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side() == PositionSide::Flat
    }

    pub fn abs_quantity(&self) -> f64 {
        self.quantity.abs()
    }

    /// Add same-direction exposure, blending the cost basis.
    pub fn add(&mut self, signed_quantity: f64, price: f64) {
        let current = self.abs_quantity();
        let added = signed_quantity.abs();
        let total = current + added;
        if total > QTY_EPSILON {
            self.avg_entry_price = (self.avg_entry_price * current + price * added) / total;
        }
        self.quantity += signed_quantity;
        self.mark(price);
    }

    /// Remove up to `quantity` units of exposure at `price`; returns the
    /// quantity actually removed. Never flips the sign.
    pub fn reduce(&mut self, quantity: f64, price: f64) -> f64 {
        let removed = quantity.min(self.abs_quantity());
        let sign = self.side().sign();
        self.quantity -= sign * removed;
        if self.abs_quantity() <= QTY_EPSILON {
            self.quantity = 0.0;
            self.avg_entry_price = 0.0;
        }
        self.mark(price);
        removed
    }

    /// Replace the cost basis of the remaining exposure and re-mark at the
    /// last price.
    pub fn rebase(&mut self, avg_entry_price: f64) {
        self.avg_entry_price = avg_entry_price;
        self.mark(self.last_price);
    }

    /// Recompute market value and unrealized PnL from a new price.
    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
        self.market_value = self.quantity * price;
        self.unrealized_pnl = if self.is_flat() {
            0.0
        } else {
            self.quantity * (price - self.avg_entry_price)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_position_has_no_value() {
        let pos = Position::flat("ETH/USDT");
        assert!(pos.is_flat());
        assert_eq!(pos.market_value, 0.0);
    }

    #[test]
    fn add_blends_cost_basis() {
        let mut pos = Position::flat("ETH/USDT");
        pos.add(10.0, 100.0);
        pos.add(10.0, 110.0);
        assert!((pos.avg_entry_price - 105.0).abs() < 1e-10);
        assert_eq!(pos.side(), PositionSide::Long);
        // 20 * (110 - 105)
        assert!((pos.unrealized_pnl - 100.0).abs() < 1e-10);
    }

    #[test]
    fn short_mark_has_negative_market_value() {
        let mut pos = Position::flat("ETH/USDT");
        pos.add(-5.0, 200.0);
        pos.mark(190.0);
        assert_eq!(pos.side(), PositionSide::Short);
        assert_eq!(pos.market_value, -950.0);
        assert!((pos.unrealized_pnl - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rebase_moves_unrealized_to_new_basis() {
        let mut pos = Position::flat("ETH/USDT");
        pos.add(20.0, 110.0);
        pos.reduce(15.0, 130.0);
        pos.rebase(120.0);
        assert_eq!(pos.last_price, 130.0);
        // 5 * (130 - 120)
        assert!((pos.unrealized_pnl - 50.0).abs() < 1e-10);
    }

    #[test]
    fn reduce_clips_and_never_flips() {
        let mut pos = Position::flat("ETH/USDT");
        pos.add(3.0, 100.0);
        let removed = pos.reduce(5.0, 105.0);
        assert_eq!(removed, 3.0);
        assert!(pos.is_flat());
        assert_eq!(pos.quantity, 0.0);
    }
}
