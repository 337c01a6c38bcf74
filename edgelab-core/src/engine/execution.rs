//! Order execution model — slippage and commission for market-style fills.
//!
//! Slippage is directional: buys fill above the reference price, sells below.
//! Commission is charged on every fill as a fraction of filled notional.
//! An intent either fully fills or is fully rejected.

use crate::domain::{OrderSide, RejectReason};
use serde::{Deserialize, Serialize};

/// Whether a fill must be funded from available cash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CashCheck {
    /// Exposure-increasing fill; rejected if notional plus commission exceeds `available`.
    Required { available: f64 },
    /// Exposure-reducing fill; never cash-constrained.
    Exempt,
}

/// Result of executing one intent.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Filled {
        price: f64,
        commission: f64,
        /// Slippage cost in currency units.
        slippage: f64,
    },
    Rejected(RejectReason),
}

impl OrderOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, OrderOutcome::Filled { .. })
    }

    /// `(filled_price, commission, accepted)`; zeros when rejected.
    pub fn summary(&self) -> (f64, f64, bool) {
        match self {
            OrderOutcome::Filled {
                price, commission, ..
            } => (*price, *commission, true),
            OrderOutcome::Rejected(_) => (0.0, 0.0, false),
        }
    }
}

/// Cost model with rates expressed as fractions (0.001 = 10 bps).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Returns `(slipped_price, slippage_amount)`.
    pub fn apply_slippage(&self, price: f64, side: OrderSide, quantity: f64) -> (f64, f64) {
        let slipped = match side {
            OrderSide::Buy => price * (1.0 + self.slippage_rate),
            OrderSide::Sell => price * (1.0 - self.slippage_rate),
        };
        (slipped, (slipped - price).abs() * quantity)
    }

    /// `quantity * fill_price * commission_rate`
    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        quantity * fill_price * self.commission_rate
    }

    /// Execute one intent at `price`. No side effects: the caller applies the
    /// outcome to its portfolio.
    pub fn execute(
        &self,
        quantity: f64,
        price: f64,
        side: OrderSide,
        cash_check: CashCheck,
    ) -> OrderOutcome {
        if !price.is_finite() || price <= 0.0 {
            return OrderOutcome::Rejected(RejectReason::InvalidPrice);
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return OrderOutcome::Rejected(RejectReason::ZeroQuantity);
        }

        let (fill_price, slippage) = self.apply_slippage(price, side, quantity);
        let commission = self.commission(fill_price, quantity);

        if let CashCheck::Required { available } = cash_check {
            let required = quantity * fill_price + commission;
            if required > available {
                return OrderOutcome::Rejected(RejectReason::InsufficientCash {
                    required,
                    available,
                });
            }
        }

        OrderOutcome::Filled {
            price: fill_price,
            commission,
            slippage,
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(0.001, 0.0005)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_fills_at_reference() {
        let outcome = CostModel::frictionless().execute(
            10.0,
            100.0,
            OrderSide::Buy,
            CashCheck::Required { available: 1_000.0 },
        );
        assert_eq!(outcome.summary(), (100.0, 0.0, true));
    }

    #[test]
    fn buy_slips_up_sell_slips_down() {
        let cost = CostModel::new(0.0, 0.01);
        let (buy, buy_slip) = cost.apply_slippage(100.0, OrderSide::Buy, 10.0);
        let (sell, sell_slip) = cost.apply_slippage(100.0, OrderSide::Sell, 10.0);
        assert!((buy - 101.0).abs() < 1e-10);
        assert!((sell - 99.0).abs() < 1e-10);
        assert!((buy_slip - 10.0).abs() < 1e-9);
        assert!((sell_slip - 10.0).abs() < 1e-9);
    }

    #[test]
    fn commission_charged_on_fill_price() {
        let cost = CostModel::new(0.001, 0.01);
        let outcome = cost.execute(10.0, 100.0, OrderSide::Buy, CashCheck::Exempt);
        let (price, commission, accepted) = outcome.summary();
        assert!(accepted);
        // 10 * 101 * 0.001
        assert!((commission - 1.01).abs() < 1e-10);
        assert!((price - 101.0).abs() < 1e-10);
    }

    #[test]
    fn buy_rejected_when_cash_short() {
        let cost = CostModel::new(0.001, 0.0);
        // 10 * 100 + 1 commission = 1001 > 1000
        let outcome = cost.execute(
            10.0,
            100.0,
            OrderSide::Buy,
            CashCheck::Required { available: 1_000.0 },
        );
        assert!(matches!(
            outcome,
            OrderOutcome::Rejected(RejectReason::InsufficientCash { .. })
        ));
        assert_eq!(outcome.summary(), (0.0, 0.0, false));
    }

    #[test]
    fn reducing_sell_ignores_cash() {
        let cost = CostModel::new(0.001, 0.0);
        let outcome = cost.execute(1_000.0, 100.0, OrderSide::Sell, CashCheck::Exempt);
        assert!(outcome.accepted());
    }

    #[test]
    fn invalid_inputs_rejected() {
        let cost = CostModel::frictionless();
        assert_eq!(
            cost.execute(1.0, f64::NAN, OrderSide::Buy, CashCheck::Exempt),
            OrderOutcome::Rejected(RejectReason::InvalidPrice)
        );
        assert_eq!(
            cost.execute(0.0, 100.0, OrderSide::Buy, CashCheck::Exempt),
            OrderOutcome::Rejected(RejectReason::ZeroQuantity)
        );
    }
}
