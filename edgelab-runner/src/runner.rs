//! Backtest orchestrator — wires a bar series provider, a signal source, the
//! portfolio simulator and the metrics engine into one run.
//!
//! Phases: `Loading -> SignalGeneration -> ExecutionLoop -> Metrics -> Done`,
//! with `Failed` reachable from any of them. Every failure, panics included,
//! is absorbed here and returned as a failed `BacktestResult` carrying
//! neutral metrics.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use edgelab_core::data::{canonicalize, BarSeriesProvider, DataError};
use edgelab_core::domain::{Bar, Order, Trade};
use edgelab_core::engine::{CloseQuantity, PortfolioSimulator, SimulationLedger};
use edgelab_core::signals::{SignalSeries, SignalSource};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::{drawdown_series, equity_curve, DrawdownPoint, EquityPoint, PortfolioMetrics};
use crate::risk_metrics::{benchmark_returns, RiskMetrics};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("insufficient data for {symbol}: {reason}")]
    InsufficientData { symbol: String, reason: String },

    #[error("signal contract violated: {0}")]
    SignalContract(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(DataError),

    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<DataError> for BacktestError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NoData { ref symbol, .. } | DataError::NotFound { ref symbol, .. } => {
                BacktestError::InsufficientData {
                    symbol: symbol.clone(),
                    reason: err.to_string(),
                }
            }
            other => BacktestError::Data(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Loading,
    SignalGeneration,
    ExecutionLoop,
    Metrics,
    Done,
    Failed,
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub config_hash: String,
    pub success: bool,
    pub message: String,
    pub phase: RunPhase,
    pub failed_phase: Option<RunPhase>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub metrics: PortfolioMetrics,
    pub risk_metrics: RiskMetrics,
    pub trades: Vec<Trade>,
    pub orders: Vec<Order>,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_series: Vec<DrawdownPoint>,
    pub bar_count: usize,
    pub signals_generated: usize,
    pub signals_executed: usize,
    pub rejected_orders: usize,
    /// Net quantity held after the run; zero for every successful run.
    pub final_position: f64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    fn failed(
        config: &BacktestConfig,
        phase: RunPhase,
        error: &BacktestError,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config: config.clone(),
            config_hash: config.config_hash(),
            success: false,
            message: error.to_string(),
            phase: RunPhase::Failed,
            failed_phase: Some(phase),
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            metrics: PortfolioMetrics::neutral(config.initial_capital),
            risk_metrics: RiskMetrics::default(),
            trades: Vec::new(),
            orders: Vec::new(),
            equity_curve: Vec::new(),
            drawdown_series: Vec::new(),
            bar_count: 0,
            signals_generated: 0,
            signals_executed: 0,
            rejected_orders: 0,
            final_position: 0.0,
        }
    }
}

/// Output of the per-bar loop over one series.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub ledger: SimulationLedger,
    pub signals_generated: usize,
    pub signals_executed: usize,
}

/// Run one backtest. Never panics and never returns an error: failures come
/// back as `success == false` with the phase they happened in.
pub fn run_backtest(
    config: &BacktestConfig,
    provider: &dyn BarSeriesProvider,
    signal: &dyn SignalSource,
) -> BacktestResult {
    let started_at = Utc::now();
    let clock = Instant::now();
    let mut phase = RunPhase::Loading;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run_phases(config, provider, signal, &mut phase)
    }));

    let error = match outcome {
        Ok(Ok(mut result)) => {
            result.started_at = started_at;
            result.finished_at = Utc::now();
            result.duration_ms = clock.elapsed().as_millis() as u64;
            return result;
        }
        Ok(Err(err)) => err,
        Err(payload) => BacktestError::Execution(panic_message(payload.as_ref())),
    };

    warn!(
        strategy = %config.strategy_id,
        symbol = %config.symbol,
        ?phase,
        error = %error,
        "backtest failed"
    );
    BacktestResult::failed(config, phase, &error, started_at, clock)
}

fn run_phases(
    config: &BacktestConfig,
    provider: &dyn BarSeriesProvider,
    signal: &dyn SignalSource,
    phase: &mut RunPhase,
) -> Result<BacktestResult, BacktestError> {
    *phase = RunPhase::Loading;
    config.validate()?;
    let bars = load_series(config, provider)?;
    let benchmark = load_benchmark(config, provider);

    *phase = RunPhase::SignalGeneration;
    let signals = generate_signals(config, signal, &bars)?;

    *phase = RunPhase::ExecutionLoop;
    let outcome = execute(config, &bars, &signals);

    *phase = RunPhase::Metrics;
    let ledger = &outcome.ledger;
    let history = &ledger.portfolio.history;
    let metrics = PortfolioMetrics::compute(
        history,
        &ledger.closed_trades,
        config.initial_capital,
        config.risk_free_rate,
    );
    let risk_metrics = RiskMetrics::compute(history, benchmark.as_deref(), config.risk_free_rate);

    *phase = RunPhase::Done;
    let final_position = ledger.portfolio.net_quantity(&config.symbol);
    info!(
        strategy = %config.strategy_id,
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash: config.config_hash(),
        success: true,
        message: format!(
            "{} trades over {} bars, {}/{} signals executed",
            metrics.total_trades,
            bars.len(),
            outcome.signals_executed,
            outcome.signals_generated
        ),
        phase: RunPhase::Done,
        failed_phase: None,
        started_at: Utc::now(),
        finished_at: Utc::now(),
        duration_ms: 0,
        equity_curve: equity_curve(history),
        drawdown_series: drawdown_series(history),
        trades: ledger.closed_trades.clone(),
        orders: ledger.orders.clone(),
        rejected_orders: ledger.orders.iter().filter(|o| o.is_rejected()).count(),
        bar_count: bars.len(),
        signals_generated: outcome.signals_generated,
        signals_executed: outcome.signals_executed,
        final_position,
        metrics,
        risk_metrics,
    })
}

// ─── Phases ─────────────────────────────────────────────────────────

fn load_series(
    config: &BacktestConfig,
    provider: &dyn BarSeriesProvider,
) -> Result<Vec<Bar>, BacktestError> {
    let raw = provider.load(
        &config.symbol,
        config.timeframe,
        config.start_date,
        config.end_date,
    )?;
    let (bars, report) = canonicalize(raw);
    if !report.is_clean() {
        warn!(
            symbol = %config.symbol,
            unsorted = report.was_unsorted,
            duplicates = report.duplicates_removed,
            invalid = report.invalid_removed,
            "bar series canonicalized"
        );
    }
    let required = config.min_bars.max(1);
    if bars.len() < required {
        return Err(BacktestError::InsufficientData {
            symbol: config.symbol.clone(),
            reason: format!("{} usable bars, need {required}", bars.len()),
        });
    }
    debug!(symbol = %config.symbol, bars = bars.len(), provider = provider.name(), "series loaded");
    Ok(bars)
}

/// Benchmark returns for CAPM stats. Failures only cost beta/alpha.
fn load_benchmark(
    config: &BacktestConfig,
    provider: &dyn BarSeriesProvider,
) -> Option<Vec<(NaiveDate, f64)>> {
    let symbol = config.benchmark_symbol.as_deref()?;
    match provider.load(symbol, config.timeframe, config.start_date, config.end_date) {
        Ok(raw) => {
            let (bars, _) = canonicalize(raw);
            Some(benchmark_returns(bars.iter().map(|b| (b.timestamp, b.close))))
        }
        Err(err) => {
            warn!(benchmark = symbol, error = %err, "benchmark unavailable");
            None
        }
    }
}

fn generate_signals(
    config: &BacktestConfig,
    signal: &dyn SignalSource,
    bars: &[Bar],
) -> Result<SignalSeries, BacktestError> {
    let series = signal
        .generate(bars, &config.parameters)
        .map_err(|e| BacktestError::SignalContract(format!("{}: {e}", signal.name())))?;
    if !series.is_aligned_to(bars.len()) {
        warn!(
            signal = signal.name(),
            bars = bars.len(),
            entries = series.entries.len(),
            exits = series.exits.len(),
            "signal length mismatch, padding/clipping with false"
        );
    }
    Ok(series.conform(bars.len()))
}

/// The per-bar loop. Strictly sequential; the value at bar `i` only uses
/// bars and signals up to `i`.
///
/// Per bar: mark to close, then exit before entry. A bar with fills is
/// re-marked so its valuation record carries that bar's costs. After the last
/// bar any open position is force-closed at the last close and the last record
/// is re-marked, so the run ends flat.
pub fn execute(config: &BacktestConfig, bars: &[Bar], signals: &SignalSeries) -> ExecutionOutcome {
    let symbol = config.symbol.as_str();
    let entry_side = config.trade_direction.entry_side();
    let mut sim = PortfolioSimulator::new(config.simulator_config());
    let mut generated = 0;
    let mut executed = 0;

    for (i, bar) in bars.iter().enumerate() {
        sim.mark(symbol, bar.close, bar.timestamp);
        let orders_before = sim.orders().len();

        if signals.exits.get(i).copied().unwrap_or(false) {
            generated += 1;
            let closed = sim.close_position(symbol, CloseQuantity::All, bar.close, bar.timestamp);
            if !closed.is_empty() {
                executed += 1;
            }
        }

        if signals.entries.get(i).copied().unwrap_or(false) {
            generated += 1;
            if sim.is_flat(symbol) {
                let quantity =
                    sim.calculate_position_size(symbol, bar.close, config.risk_per_trade_pct);
                match sim.open_position(symbol, entry_side, quantity, bar.close, bar.timestamp) {
                    Ok(_) => executed += 1,
                    Err(reason) => debug!(symbol, bar = i, %reason, "entry not executed"),
                }
            }
        }

        if sim.orders().len() != orders_before {
            sim.mark(symbol, bar.close, bar.timestamp);
        }
    }

    if let Some(last) = bars.last() {
        if !sim.is_flat(symbol) {
            sim.close_position(symbol, CloseQuantity::All, last.close, last.timestamp);
        }
        sim.mark(symbol, last.close, last.timestamp);
    }

    ExecutionOutcome {
        ledger: sim.into_ledger(),
        signals_generated: generated,
        signals_executed: executed,
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}
