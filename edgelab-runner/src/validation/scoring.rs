//! Suite scoring — composite scores and alpha analysis.
//!
//! Pure functions of the scenario results. Aggregates are taken over
//! successful scenarios only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::battery::STRESS_REGIME;
use super::ValidationResult;
use crate::metrics::{mean_f64, std_dev};

/// Minimum `alpha_score` for `has_edge`.
pub const EDGE_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuiteScores {
    pub pass_rate: f64,
    pub performance_score: f64,
    pub risk_score: f64,
    pub overall_score: f64,
}

impl SuiteScores {
    /// `overall = 0.3 * pass_rate * 100 + 0.4 * performance + 0.3 * risk`.
    pub fn compute(results: &[ValidationResult]) -> Self {
        let total = results.len();
        let passed: Vec<&ValidationResult> = results.iter().filter(|r| r.success).collect();
        let pass_rate = if total > 0 {
            passed.len() as f64 / total as f64
        } else {
            0.0
        };

        let (performance_score, risk_score) = if passed.is_empty() {
            (0.0, 0.0)
        } else {
            let sharpes: Vec<f64> = passed.iter().map(|r| r.metrics.sharpe_ratio).collect();
            let drawdowns: Vec<f64> = passed.iter().map(|r| r.metrics.max_drawdown_pct()).collect();
            (
                performance_score(mean_f64(&sharpes)),
                risk_score(mean_f64(&drawdowns)),
            )
        };

        Self {
            pass_rate,
            performance_score,
            risk_score,
            overall_score: 0.3 * pass_rate * 100.0 + 0.4 * performance_score + 0.3 * risk_score,
        }
    }
}

/// Mean Sharpe mapped to 0–100; Sharpe 2 scores 100.
pub fn performance_score(mean_sharpe: f64) -> f64 {
    (mean_sharpe / 2.0 * 100.0).clamp(0.0, 100.0)
}

/// `max(0, 100 - 2 * mean |max drawdown %|)`
pub fn risk_score(mean_drawdown_pct: f64) -> f64 {
    (100.0 - 2.0 * mean_drawdown_pct.abs()).max(0.0)
}

// ─── Alpha ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceGrade {
    Insufficient,
    Low,
    Medium,
    High,
}

impl ConfidenceGrade {
    pub fn from_score(alpha_score: f64) -> Self {
        if alpha_score >= 70.0 {
            Self::High
        } else if alpha_score >= 50.0 {
            Self::Medium
        } else if alpha_score >= 30.0 {
            Self::Low
        } else {
            Self::Insufficient
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Insufficient => "insufficient",
        }
    }
}

/// Point contributions to `alpha_score`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphaComponents {
    /// 0–30
    pub sharpe: f64,
    /// 0–25
    pub drawdown: f64,
    /// 0–20
    pub win_rate: f64,
    /// 0–15
    pub profit_factor: f64,
    /// 0–10
    pub consistency: f64,
}

impl AlphaComponents {
    pub fn compute(
        mean_sharpe: f64,
        mean_drawdown_pct: f64,
        mean_win_rate: f64,
        mean_profit_factor: f64,
        sharpe_std: f64,
    ) -> Self {
        Self {
            sharpe: (mean_sharpe / 2.0 * 30.0).clamp(0.0, 30.0),
            drawdown: ((1.0 - mean_drawdown_pct.abs() / 50.0) * 25.0).max(0.0),
            win_rate: (mean_win_rate / 100.0 * 20.0).clamp(0.0, 20.0),
            profit_factor: ((mean_profit_factor - 1.0) / 2.0 * 15.0).clamp(0.0, 15.0),
            consistency: (10.0 - 5.0 * sharpe_std).max(0.0),
        }
    }

    pub fn total(&self) -> f64 {
        (self.sharpe + self.drawdown + self.win_rate + self.profit_factor + self.consistency)
            .clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaFindings {
    pub alpha_score: f64,
    pub components: AlphaComponents,
    pub confidence: ConfidenceGrade,
    pub has_edge: bool,
    pub samples: usize,
    pub mean_sharpe: f64,
    pub sharpe_std: f64,
    /// Percent, positive.
    pub mean_max_drawdown_pct: f64,
    pub mean_win_rate: f64,
    pub mean_profit_factor: f64,
    pub mean_total_return: f64,
    /// Mean Sharpe per regime tag.
    pub regime_performance: BTreeMap<String, f64>,
    pub best_regime: Option<String>,
    pub worst_regime: Option<String>,
}

/// Alpha analysis, or `None` when the pass rate is under `min_pass_rate` or
/// nothing passed.
pub fn analyze_alpha(results: &[ValidationResult], min_pass_rate: f64) -> Option<AlphaFindings> {
    let scores = SuiteScores::compute(results);
    let passed: Vec<&ValidationResult> = results.iter().filter(|r| r.success).collect();
    if passed.is_empty() || scores.pass_rate < min_pass_rate {
        return None;
    }

    let sharpes = field(&passed, |r| r.metrics.sharpe_ratio);
    let mean_sharpe = mean_f64(&sharpes);
    let sharpe_std = std_dev(&sharpes);
    let mean_max_drawdown_pct = mean_f64(&field(&passed, |r| r.metrics.max_drawdown_pct()));
    let mean_win_rate = mean_f64(&field(&passed, |r| r.metrics.win_rate));
    let mean_profit_factor = mean_f64(&field(&passed, |r| r.metrics.profit_factor));

    let components = AlphaComponents::compute(
        mean_sharpe,
        mean_max_drawdown_pct,
        mean_win_rate,
        mean_profit_factor,
        sharpe_std,
    );
    let alpha_score = components.total();
    let regime_performance = regime_performance(&passed);
    let (best_regime, worst_regime) = extremes(&regime_performance);

    Some(AlphaFindings {
        alpha_score,
        components,
        confidence: ConfidenceGrade::from_score(alpha_score),
        has_edge: alpha_score >= EDGE_THRESHOLD,
        samples: passed.len(),
        mean_sharpe,
        sharpe_std,
        mean_max_drawdown_pct,
        mean_win_rate,
        mean_profit_factor,
        mean_total_return: mean_f64(&field(&passed, |r| r.metrics.total_return)),
        regime_performance,
        best_regime,
        worst_regime,
    })
}

fn field(passed: &[&ValidationResult], f: impl Fn(&ValidationResult) -> f64) -> Vec<f64> {
    passed.iter().map(|r| f(r)).collect()
}

fn regime_performance(passed: &[&ValidationResult]) -> BTreeMap<String, f64> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for result in passed {
        if let Some(regime) = result.regime() {
            grouped
                .entry(regime.to_string())
                .or_default()
                .push(result.metrics.sharpe_ratio);
        }
    }
    grouped
        .into_iter()
        .map(|(regime, sharpes)| (regime, mean_f64(&sharpes)))
        .collect()
}

/// Best and worst market regime. Stress variants are cost scenarios, not
/// regimes, and never rank. Ties resolve to the alphabetically first regime.
fn extremes(regimes: &BTreeMap<String, f64>) -> (Option<String>, Option<String>) {
    let mut best: Option<(&String, f64)> = None;
    let mut worst: Option<(&String, f64)> = None;
    for (name, &sharpe) in regimes.iter().filter(|(name, _)| name.as_str() != STRESS_REGIME) {
        if best.map_or(true, |(_, b)| sharpe > b) {
            best = Some((name, sharpe));
        }
        if worst.map_or(true, |(_, w)| sharpe < w) {
            worst = Some((name, sharpe));
        }
    }
    (best.map(|(n, _)| n.clone()), worst.map(|(n, _)| n.clone()))
}
