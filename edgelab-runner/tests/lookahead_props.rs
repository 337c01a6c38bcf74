//! Property tests for the orchestrator's bar loop: no look-ahead and
//! flat-at-end.

use chrono::{Duration, TimeZone, Utc};
use edgelab_core::domain::Bar;
use edgelab_core::signals::{MovingAverageCross, SignalSeries, SignalSource, StrategyParams};
use edgelab_runner::runner::execute;
use edgelab_runner::BacktestConfig;
use proptest::prelude::*;
use serde_json::json;

fn bars(closes: &[f64]) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::flat(t0 + Duration::days(i as i64), c))
        .collect()
}

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05f64..0.05, 10..80).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|r| {
                price *= 1.0 + r;
                price
            })
            .collect()
    })
}

fn fast_cross_params() -> StrategyParams {
    StrategyParams::from([
        ("fast_period".to_string(), json!(2)),
        ("slow_period".to_string(), json!(5)),
    ])
}

fn config() -> BacktestConfig {
    BacktestConfig {
        symbol: "SOL/USDT".into(),
        ..BacktestConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Streaming a prefix gives the same valuation path and order ledger up to
    /// the bar before the prefix ends.
    #[test]
    fn prefix_run_matches_full_run(closes in closes_strategy(), cut in 0.2f64..1.0) {
        let full_bars = bars(&closes);
        let params = fast_cross_params();
        let full_signals = MovingAverageCross.generate(&full_bars, &params).unwrap();
        let full = execute(&config(), &full_bars, &full_signals);

        let end = ((full_bars.len() as f64 * cut) as usize).clamp(2, full_bars.len());
        let prefix_bars = &full_bars[..end];
        let prefix_signals = MovingAverageCross.generate(prefix_bars, &params).unwrap();

        // The signal itself is causal.
        prop_assert_eq!(&prefix_signals.entries[..], &full_signals.entries[..end]);
        prop_assert_eq!(&prefix_signals.exits[..], &full_signals.exits[..end]);

        let prefix = execute(&config(), prefix_bars, &prefix_signals);

        // The last prefix record is re-marked by the forced close; everything
        // before it must match exactly.
        let n = end - 1;
        prop_assert_eq!(
            &prefix.ledger.portfolio.history[..n],
            &full.ledger.portfolio.history[..n]
        );
        let cutoff = full_bars[n].timestamp;
        let before = |orders: &[edgelab_core::domain::Order]| {
            orders.iter().filter(|o| o.timestamp < cutoff).cloned().collect::<Vec<_>>()
        };
        prop_assert_eq!(before(&prefix.ledger.orders), before(&full.ledger.orders));
    }

    #[test]
    fn every_run_ends_flat(
        closes in closes_strategy(),
        entry_bits in prop::collection::vec(any::<bool>(), 80),
        exit_bits in prop::collection::vec(any::<bool>(), 80),
    ) {
        let bars = bars(&closes);
        let n = bars.len();
        let signals = SignalSeries::new(entry_bits[..n].to_vec(), exit_bits[..n].to_vec());

        let outcome = execute(&config(), &bars, &signals);
        let portfolio = &outcome.ledger.portfolio;

        prop_assert_eq!(portfolio.net_quantity("SOL/USDT"), 0.0);
        prop_assert!(outcome.ledger.open_trades.is_empty());
        prop_assert_eq!(portfolio.history.len(), n);
        prop_assert!(outcome.signals_executed <= outcome.signals_generated);
        // Flat means value is all cash.
        let last = portfolio.history.last().unwrap();
        prop_assert!((last.total_value - portfolio.cash).abs() < 1e-6);
    }
}
