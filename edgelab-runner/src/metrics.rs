//! Performance metrics — pure functions over a finished run.
//!
//! Inputs are the valuation history and the closed-trade ledger. Every ratio
//! falls back to 0.0 when its denominator is zero or the data is too short,
//! so results never carry NaN.

use chrono::{DateTime, Utc};
use edgelab_core::domain::{Trade, ValuationRecord};
use edgelab_core::engine::PeriodSampler;
use serde::{Deserialize, Serialize};

/// Periods per year used to annualize periodic (daily) statistics.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Drawdown below this (as a fraction) counts as underwater for duration.
pub const UNDERWATER_THRESHOLD: f64 = -0.001;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub initial_capital: f64,
    pub final_value: f64,
    /// Fraction, e.g. 0.12 = +12%.
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Fraction, non-positive.
    pub max_drawdown: f64,
    pub max_drawdown_duration_days: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Percent of initial capital.
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub largest_win_pct: f64,
    pub largest_loss_pct: f64,
    pub avg_trade_duration_hours: f64,
    pub time_in_market_pct: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
}

impl PortfolioMetrics {
    /// Neutral metrics for a run that produced nothing.
    pub fn neutral(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            final_value: initial_capital,
            ..Self::default()
        }
    }

    /// `max_drawdown` as a positive percent.
    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown.abs() * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub timestamp: DateTime<Utc>,
    pub drawdown: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl PortfolioMetrics {
    pub fn compute(
        history: &[ValuationRecord],
        trades: &[Trade],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let returns = PeriodSampler::from_history(history).returns();
        let final_value = history.last().map_or(initial_capital, |r| r.total_value);
        let total = total_return(initial_capital, final_value);
        let annualized = annualized_return(total, span_days(history));
        let drawdowns = drawdown_series(history);
        let max_dd = max_drawdown(&drawdowns);
        let stats = TradeStats::compute(trades, initial_capital);

        let mut metrics = Self {
            initial_capital,
            final_value,
            total_return: total,
            annualized_return: annualized,
            volatility: volatility(&returns),
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
            sortino_ratio: sortino_ratio(&returns, risk_free_rate),
            calmar_ratio: calmar_ratio(annualized, max_dd),
            max_drawdown: max_dd,
            max_drawdown_duration_days: max_drawdown_duration_days(&drawdowns),
            time_in_market_pct: time_in_market_pct(trades, history),
            total_commission: trades.iter().map(|t| t.commission).sum(),
            total_slippage: trades.iter().map(|t| t.slippage).sum(),
            ..Self::default()
        };
        stats.apply(&mut metrics);
        metrics
    }
}

// ─── Returns ────────────────────────────────────────────────────────

/// `(final - initial) / initial`
pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_value - initial_capital) / initial_capital
}

/// `(1 + total)^(1/years) - 1` with `years >= 1/365`; -1 once capital is gone.
pub fn annualized_return(total_return: f64, days_elapsed: f64) -> f64 {
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    let years = (days_elapsed / 365.25).max(1.0 / 365.0);
    let annualized = growth.powf(1.0 / years) - 1.0;
    if annualized.is_finite() {
        annualized
    } else {
        0.0
    }
}

/// Fractional days between the first and last valuation.
pub fn span_days(history: &[ValuationRecord]) -> f64 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) => seconds_between(first.timestamp, last.timestamp) / 86_400.0,
        _ => 0.0,
    }
}

pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * PERIODS_PER_YEAR.sqrt()
}

/// `(mean * 252 - rf) / volatility`
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let vol = volatility(returns);
    if vol < 1e-15 {
        return 0.0;
    }
    (mean_f64(returns) * PERIODS_PER_YEAR - risk_free_rate) / vol
}

/// Same numerator as Sharpe over the annualized deviation of negative returns.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let downside = downside_deviation(returns);
    if downside < 1e-15 {
        return 0.0;
    }
    (mean_f64(returns) * PERIODS_PER_YEAR - risk_free_rate) / downside
}

/// Annualized sample deviation of the negative returns only.
pub fn downside_deviation(returns: &[f64]) -> f64 {
    let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    std_dev(&negatives) * PERIODS_PER_YEAR.sqrt()
}

// ─── Drawdown ───────────────────────────────────────────────────────

/// `(value - running_max) / running_max` per valuation record.
pub fn drawdown_series(history: &[ValuationRecord]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    history
        .iter()
        .map(|r| {
            peak = peak.max(r.total_value);
            let drawdown = if peak > 0.0 {
                (r.total_value - peak) / peak
            } else {
                0.0
            };
            DrawdownPoint {
                timestamp: r.timestamp,
                drawdown,
            }
        })
        .collect()
}

pub fn max_drawdown(drawdowns: &[DrawdownPoint]) -> f64 {
    drawdowns.iter().map(|d| d.drawdown).fold(0.0, f64::min)
}

/// Longest underwater stretch in days: from the first record below the
/// threshold to the record that recovers, or to the last record.
pub fn max_drawdown_duration_days(drawdowns: &[DrawdownPoint]) -> f64 {
    let mut longest = 0.0_f64;
    let mut underwater_since: Option<DateTime<Utc>> = None;
    for point in drawdowns {
        match (underwater_since, point.drawdown < UNDERWATER_THRESHOLD) {
            (None, true) => underwater_since = Some(point.timestamp),
            (Some(start), false) => {
                longest = longest.max(seconds_between(start, point.timestamp) / 86_400.0);
                underwater_since = None;
            }
            _ => {}
        }
    }
    if let (Some(start), Some(last)) = (underwater_since, drawdowns.last()) {
        longest = longest.max(seconds_between(start, last.timestamp) / 86_400.0);
    }
    longest
}

/// `annualized / |max_drawdown|`, 0 without a drawdown.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown.abs() < 1e-15 {
        return 0.0;
    }
    annualized_return / max_drawdown.abs()
}

pub fn equity_curve(history: &[ValuationRecord]) -> Vec<EquityPoint> {
    history
        .iter()
        .map(|r| EquityPoint {
            timestamp: r.timestamp,
            value: r.total_value,
        })
        .collect()
}

// ─── Trade statistics ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct TradeStats {
    total: usize,
    winners: usize,
    losers: usize,
    avg_win: f64,
    avg_loss: f64,
    largest_win: f64,
    largest_loss: f64,
    avg_duration_hours: f64,
    initial_capital: f64,
}

impl TradeStats {
    fn compute(trades: &[Trade], initial_capital: f64) -> Self {
        let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();
        let durations: Vec<f64> = trades
            .iter()
            .map(|t| t.duration_secs as f64 / 3_600.0)
            .collect();
        Self {
            total: trades.len(),
            winners: wins.len(),
            losers: losses.len(),
            avg_win: mean_f64(&wins),
            avg_loss: mean_f64(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            avg_duration_hours: mean_f64(&durations),
            initial_capital,
        }
    }

    fn pct_of_capital(&self, value: f64) -> f64 {
        if self.initial_capital > 0.0 {
            value / self.initial_capital * 100.0
        } else {
            0.0
        }
    }

    fn apply(&self, m: &mut PortfolioMetrics) {
        m.total_trades = self.total;
        m.winning_trades = self.winners;
        m.losing_trades = self.losers;
        m.win_rate = if self.total > 0 {
            self.winners as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };
        m.profit_factor = profit_factor(self.avg_win, self.avg_loss);
        m.avg_win = self.avg_win;
        m.avg_loss = self.avg_loss;
        m.avg_win_pct = self.pct_of_capital(self.avg_win);
        m.avg_loss_pct = self.pct_of_capital(self.avg_loss);
        m.largest_win = self.largest_win;
        m.largest_loss = self.largest_loss;
        m.largest_win_pct = self.pct_of_capital(self.largest_win);
        m.largest_loss_pct = self.pct_of_capital(self.largest_loss);
        m.avg_trade_duration_hours = self.avg_duration_hours;
    }
}

/// `avg(win) / |avg(loss)|`, 0 without losers.
pub fn profit_factor(avg_win: f64, avg_loss: f64) -> f64 {
    if avg_loss.abs() < 1e-15 {
        return 0.0;
    }
    avg_win / avg_loss.abs()
}

/// Σ trade durations over the valuation span, in percent.
pub fn time_in_market_pct(trades: &[Trade], history: &[ValuationRecord]) -> f64 {
    let span_secs = span_days(history) * 86_400.0;
    if span_secs <= 0.0 {
        return 0.0;
    }
    let held: f64 = trades.iter().map(|t| t.duration_secs as f64).sum();
    held / span_secs * 100.0
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 below two samples.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds().max(0) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use edgelab_core::domain::{PositionSide, TradeId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn history(values: &[f64]) -> Vec<ValuationRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ValuationRecord {
                timestamp: t0() + Duration::days(i as i64),
                total_value: v,
                cash: v,
                positions_value: 0.0,
                unrealized_pnl: 0.0,
                realized_pnl: 0.0,
            })
            .collect()
    }

    fn closed_trade(pnl_per_unit: f64, days: i64) -> Trade {
        let mut trade = Trade::open(TradeId(1), "X", PositionSide::Long, t0(), 100.0, 1.0, 0.0, 0.0);
        trade.close(t0() + Duration::days(days), 100.0 + pnl_per_unit, 0.0, 0.0);
        trade
    }

    #[test]
    fn empty_run_is_neutral() {
        let m = PortfolioMetrics::compute(&history(&[10_000.0; 100]), &[], 10_000.0, 0.02);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
    }

    #[test]
    fn no_history_is_neutral() {
        let m = PortfolioMetrics::compute(&[], &[], 5_000.0, 0.02);
        assert_eq!(m.final_value, 5_000.0);
        assert_eq!(m.annualized_return, 0.0);
        assert_eq!(m, PortfolioMetrics { initial_capital: 5_000.0, final_value: 5_000.0, ..PortfolioMetrics::default() });
    }

    #[test]
    fn annualized_return_floors_years() {
        // One day counts as 1/365 of a year at minimum.
        assert!((annualized_return(0.0, 0.0)).abs() < 1e-12);
        assert_eq!(annualized_return(-1.5, 10.0), -1.0);
        let one_year = annualized_return(0.1, 365.25);
        assert!((one_year - 0.1).abs() < 1e-12);
    }

    #[test]
    fn drawdown_and_duration() {
        let h = history(&[100.0, 110.0, 99.0, 105.0, 111.0, 100.0]);
        let dd = drawdown_series(&h);
        assert!((max_drawdown(&dd) - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
        // Underwater from day 2 to day 4 (recovered at 111), then day 5 to end.
        assert!((max_drawdown_duration_days(&dd) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sharpe_zero_without_variance() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], 0.0), 0.0);
        assert_eq!(sharpe_ratio(&[0.01], 0.0), 0.0);
    }

    #[test]
    fn sharpe_and_sortino_signs() {
        let returns = [0.01, -0.005, 0.02, -0.01, 0.015];
        assert!(sharpe_ratio(&returns, 0.0) > 0.0);
        assert!(sortino_ratio(&returns, 0.0) > 0.0);
        // Single negative return: no downside deviation.
        assert_eq!(sortino_ratio(&[0.01, -0.01, 0.02], 0.0), 0.0);
    }

    #[test]
    fn trade_stats() {
        let trades = vec![closed_trade(10.0, 1), closed_trade(-5.0, 2), closed_trade(20.0, 3)];
        let m = PortfolioMetrics::compute(&history(&[1_000.0, 1_025.0]), &trades, 1_000.0, 0.0);
        assert_eq!(m.total_trades, 3);
        assert_eq!(m.winning_trades, 2);
        assert!((m.win_rate - 200.0 / 3.0).abs() < 1e-9);
        // avg win 15 / |avg loss 5|
        assert!((m.profit_factor - 3.0).abs() < 1e-12);
        assert_eq!(m.largest_win, 20.0);
        assert_eq!(m.largest_loss, -5.0);
        assert!((m.largest_win_pct - 2.0).abs() < 1e-12);
        assert!((m.avg_loss_pct + 0.5).abs() < 1e-12);
        assert!((m.avg_trade_duration_hours - 48.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_zero_without_losers() {
        let trades = vec![closed_trade(10.0, 1)];
        let m = PortfolioMetrics::compute(&history(&[1_000.0, 1_010.0]), &trades, 1_000.0, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.win_rate, 100.0);
    }

    #[test]
    fn time_in_market_over_span() {
        let trades = vec![closed_trade(1.0, 2)];
        let h = history(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        assert!((time_in_market_pct(&trades, &h) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn std_dev_is_sample() {
        assert!((std_dev(&[1.0, 2.0, 3.0, 4.0]) - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(std_dev(&[3.0]), 0.0);
    }
}
