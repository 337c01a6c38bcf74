//! Property tests for simulator invariants.
//!
//! 1. Cash conservation: cash moves by exactly the accepted fills' notional and commission
//! 2. Value identity: total value == cash + Σ market value after every operation
//! 3. No flip: a close never crosses zero
//! 4. Ledger consistency: open trade quantity always matches the position
//! 5. PnL identity: equity change == realized + unrealized - open entry commission

use chrono::{DateTime, Duration, TimeZone, Utc};
use edgelab_core::domain::OrderSide;
use edgelab_core::engine::{CloseQuantity, PortfolioSimulator, SimulatorConfig};
use proptest::prelude::*;

const SYM: &str = "BTC/USDT";

#[derive(Debug, Clone)]
enum Op {
    Open { side: OrderSide, qty: f64 },
    Close { fraction: Option<f64> },
    Mark,
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 0.1..80.0_f64).prop_map(|(long, qty)| Op::Open {
            side: if long { OrderSide::Buy } else { OrderSide::Sell },
            qty,
        }),
        prop::option::of(0.1..1.5_f64).prop_map(|fraction| Op::Close { fraction }),
        Just(Op::Mark),
    ]
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn ts(step: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(step as i64)
}

fn open_trade_qty(sim: &PortfolioSimulator) -> f64 {
    sim.open_trades().iter().map(|t| t.quantity).sum()
}

proptest! {
    #[test]
    fn cash_conservation(
        ops in prop::collection::vec((arb_op(), arb_price()), 1..60),
        commission in 0.0..0.01_f64,
        slippage in 0.0..0.01_f64,
    ) {
        let mut sim = PortfolioSimulator::new(
            SimulatorConfig::new(10_000.0).with_costs(commission, slippage),
        );
        let mut expected_cash = 10_000.0;

        for (step, (op, price)) in ops.into_iter().enumerate() {
            let before_orders = sim.orders().len();
            match op {
                Op::Open { side, qty } => {
                    let _ = sim.open_position(SYM, side, qty, price, ts(step));
                }
                Op::Close { fraction } => {
                    let held = sim.portfolio().net_quantity(SYM).abs();
                    let quantity = match fraction {
                        Some(f) => CloseQuantity::Partial(held * f),
                        None => CloseQuantity::All,
                    };
                    sim.close_position(SYM, quantity, price, ts(step));
                }
                Op::Mark => {
                    sim.mark(SYM, price, ts(step));
                }
            }
            for order in &sim.orders()[before_orders..] {
                if order.is_filled() {
                    match order.side {
                        OrderSide::Buy => expected_cash -= order.notional() + order.commission,
                        OrderSide::Sell => expected_cash += order.notional() - order.commission,
                    }
                }
            }
            prop_assert!((sim.portfolio().cash - expected_cash).abs() < 1e-6);
        }
    }

    #[test]
    fn value_identity_and_ledger_consistency(
        ops in prop::collection::vec((arb_op(), arb_price()), 1..60),
    ) {
        let mut sim = PortfolioSimulator::new(SimulatorConfig::new(10_000.0).with_costs(0.001, 0.0005));
        for (step, (op, price)) in ops.into_iter().enumerate() {
            let before = sim.portfolio().net_quantity(SYM);
            match op {
                Op::Open { side, qty } => {
                    let _ = sim.open_position(SYM, side, qty, price, ts(step));
                }
                Op::Close { fraction } => {
                    let quantity = fraction
                        .map(|f| CloseQuantity::Partial(before.abs() * f))
                        .unwrap_or(CloseQuantity::All);
                    sim.close_position(SYM, quantity, price, ts(step));
                    let after = sim.portfolio().net_quantity(SYM);
                    // Never crosses zero.
                    prop_assert!(before * after >= 0.0);
                    prop_assert!(after.abs() <= before.abs() + 1e-9);
                }
                Op::Mark => {
                    sim.mark(SYM, price, ts(step));
                }
            }
            let p = sim.portfolio();
            prop_assert!((p.total_value() - (p.cash + p.positions_value())).abs() < 1e-9);
            prop_assert!((open_trade_qty(&sim) - p.net_quantity(SYM).abs()).abs() < 1e-6);
        }
    }

    #[test]
    fn pnl_matches_equity_change(
        ops in prop::collection::vec((arb_op(), arb_price()), 1..60),
        commission in 0.0..0.01_f64,
        slippage in 0.0..0.01_f64,
    ) {
        let mut sim = PortfolioSimulator::new(
            SimulatorConfig::new(10_000.0).with_costs(commission, slippage),
        );
        for (step, (op, price)) in ops.into_iter().enumerate() {
            match op {
                Op::Open { side, qty } => {
                    let _ = sim.open_position(SYM, side, qty, price, ts(step));
                }
                Op::Close { fraction } => {
                    let held = sim.portfolio().net_quantity(SYM).abs();
                    let quantity = fraction
                        .map(|f| CloseQuantity::Partial(held * f))
                        .unwrap_or(CloseQuantity::All);
                    sim.close_position(SYM, quantity, price, ts(step));
                }
                Op::Mark => {
                    sim.mark(SYM, price, ts(step));
                }
            }
            // Entry commission of still-open trades is paid but not yet in any PnL.
            let open_commission: f64 = sim.open_trades().iter().map(|t| t.commission).sum();
            let p = sim.portfolio();
            let equity_change = p.total_value() - p.initial_capital;
            prop_assert!(
                (p.total_pnl() - open_commission - equity_change).abs() < 1e-6,
                "pnl {} open commission {} equity change {}",
                p.total_pnl(), open_commission, equity_change
            );
        }
    }
}
