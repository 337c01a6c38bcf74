//! Artifact export — JSON, CSV and Markdown for runs and validation suites.
//!
//! Run artifacts land in `<output_dir>/<config_hash[..12]>/`, so re-running an
//! identical config overwrites its own directory. Persisted results carry a
//! `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use edgelab_core::domain::Trade;

use crate::metrics::EquityPoint;
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::validation::{ValidationReport, ValidationSuite};

const HASH_PREFIX_LEN: usize = 12;

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Closed-trade tape. Partial-close slices carry their parent id.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "trade_id",
        "parent_trade_id",
        "symbol",
        "side",
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "quantity",
        "pnl",
        "pnl_pct",
        "commission",
        "slippage",
        "duration_hours",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.id.to_string(),
            &t.parent_trade_id.map(|p| p.to_string()).unwrap_or_default(),
            &t.symbol,
            &format!("{:?}", t.side),
            &t.entry_time.to_rfc3339(),
            &t.exit_time.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            &format!("{:.6}", t.entry_price),
            &t.exit_price.map(|p| format!("{p:.6}")).unwrap_or_default(),
            &format!("{:.6}", t.quantity),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_pct),
            &format!("{:.2}", t.commission),
            &format!("{:.2}", t.slippage),
            &format!("{:.2}", t.duration_secs as f64 / 3600.0),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for point in equity_curve {
        wtr.write_record([&point.timestamp.to_rfc3339(), &format!("{:.2}", point.value)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Save a single run as `result.json`, `trades.csv`, `equity.csv` and
/// `report.md`. Returns the run directory.
pub fn save_run_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix = &result.config_hash[..HASH_PREFIX_LEN.min(result.config_hash.len())];
    let run_dir = output_dir.join(prefix);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("result.json"), &export_json(result)?)?;
    write(&run_dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?;
    write(&run_dir.join("equity.csv"), &export_equity_csv(&result.equity_curve)?)?;
    write(&run_dir.join("report.md"), &run_report_markdown(result))?;

    tracing::info!(dir = %run_dir.display(), "run artifacts saved");
    Ok(run_dir)
}

pub fn load_run_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Save a suite as `suite.json`, `report.json` and `report.md` under
/// `<output_dir>/validation_<strategy_id>/`.
pub fn save_suite_artifacts(
    suite: &ValidationSuite,
    report: &ValidationReport,
    output_dir: &Path,
) -> Result<PathBuf> {
    let suite_dir = output_dir.join(format!("validation_{}", sanitize(&suite.strategy_id)));
    std::fs::create_dir_all(&suite_dir)
        .with_context(|| format!("failed to create artifact dir: {}", suite_dir.display()))?;

    let suite_json =
        serde_json::to_string_pretty(suite).context("failed to serialize ValidationSuite")?;
    let report_json =
        serde_json::to_string_pretty(report).context("failed to serialize ValidationReport")?;
    write(&suite_dir.join("suite.json"), &suite_json)?;
    write(&suite_dir.join("report.json"), &report_json)?;
    write(&suite_dir.join("report.md"), &report.to_markdown())?;

    tracing::info!(dir = %suite_dir.display(), "validation artifacts saved");
    Ok(suite_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn run_report_markdown(result: &BacktestResult) -> String {
    let c = &result.config;
    let m = &result.metrics;
    let r = &result.risk_metrics;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", c.strategy_id));
    md.push_str(&format!("| Symbol | {} ({}) |\n", c.symbol, c.timeframe));
    md.push_str(&format!("| Period | {} to {} |\n", c.start_date, c.end_date));
    md.push_str(&format!("| Initial Capital | ${:.0} |\n", c.initial_capital));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!(
        "| Signals | {} generated, {} executed |\n",
        result.signals_generated, result.signals_executed
    ));
    md.push_str(&format!("| Rejected Orders | {} |\n", result.rejected_orders));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    if !result.success {
        md.push_str(&format!("| Status | **FAILED**: {} |\n", result.message));
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | ${:.2} |\n", m.final_value));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Annualized Return | {:.2}% |\n", m.annualized_return * 100.0));
    md.push_str(&format!("| Volatility | {:.2}% |\n", m.volatility * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino_ratio));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar_ratio));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!(
        "| Max DD Duration | {:.1} days |\n",
        m.max_drawdown_duration_days
    ));
    md.push_str(&format!("| Trades | {} |\n", m.total_trades));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Time in Market | {:.1}% |\n", m.time_in_market_pct));
    md.push_str(&format!(
        "| Costs | ${:.2} commission, ${:.2} slippage |\n",
        m.total_commission, m.total_slippage
    ));
    md.push('\n');

    md.push_str("## Risk\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| VaR 95% | {:.2}% |\n", r.var_95 * 100.0));
    md.push_str(&format!("| CVaR 95% | {:.2}% |\n", r.cvar_95 * 100.0));
    md.push_str(&format!("| Max Exposure | {:.1}% |\n", r.max_exposure * 100.0));
    if r.benchmark_samples > 0 {
        md.push_str(&format!(
            "| Beta / Alpha | {:.3} / {:.2}% ({} samples) |\n",
            r.beta,
            r.alpha * 100.0,
            r.benchmark_samples
        ));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strategy_names() {
        assert_eq!(sanitize("sma 20/50"), "sma_20_50");
        assert_eq!(sanitize("ok-name_1"), "ok-name_1");
    }

    #[test]
    fn empty_trades_csv_has_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("trade_id,parent_trade_id,symbol"));
    }
}
