//! Criterion benchmark for the simulator's per-bar loop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use edgelab_core::data::{BarSeriesProvider, SyntheticProvider, Timeframe};
use edgelab_core::domain::OrderSide;
use edgelab_core::engine::{CloseQuantity, PortfolioSimulator, SimulatorConfig};
use edgelab_core::signals::{MovingAverageCross, SignalSource, StrategyParams};
use chrono::NaiveDate;

const SYMBOL: &str = "BTC/USDT";

fn bench_bar_loop(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let bars = SyntheticProvider::default()
        .load(SYMBOL, Timeframe::H1, start, end)
        .unwrap();
    let signals = MovingAverageCross
        .generate(&bars, &StrategyParams::new())
        .unwrap();

    c.bench_function("simulator_bar_loop_1h_1y", |b| {
        b.iter(|| {
            let mut sim = PortfolioSimulator::new(SimulatorConfig::new(10_000.0));
            for (i, bar) in bars.iter().enumerate() {
                sim.mark(SYMBOL, bar.close, bar.timestamp);
                if signals.exits[i] {
                    sim.close_position(SYMBOL, CloseQuantity::All, bar.close, bar.timestamp);
                }
                if signals.entries[i] && sim.is_flat(SYMBOL) {
                    let qty = sim.calculate_position_size(SYMBOL, bar.close, 2.0);
                    let _ = sim.open_position(SYMBOL, OrderSide::Buy, qty, bar.close, bar.timestamp);
                }
            }
            black_box(sim.into_ledger())
        })
    });
}

criterion_group!(benches, bench_bar_loop);
criterion_main!(benches);
