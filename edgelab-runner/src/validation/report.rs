//! Validation report — a pure view over a finished suite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scoring::{AlphaFindings, ConfidenceGrade};
use super::ValidationSuite;
use crate::metrics::mean_f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub strategy_id: String,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    /// Percent.
    pub pass_rate_pct: f64,
    pub duration_ms: u64,
    pub verdict: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub overall_score: f64,
    pub performance_score: f64,
    pub risk_score: f64,
    pub alpha_score: Option<f64>,
    pub confidence: Option<ConfidenceGrade>,
    pub has_edge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRow {
    pub regime: String,
    pub tests: usize,
    pub passed: usize,
    pub mean_sharpe: f64,
    pub mean_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRow {
    pub test_name: String,
    pub regime: Option<String>,
    pub success: bool,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    pub test_name: String,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub summary: ReportSummary,
    pub scores: ScoreBreakdown,
    pub regimes: Vec<RegimeRow>,
    pub tests: Vec<TestRow>,
    pub failures: Vec<FailureRow>,
    pub alpha_findings: Option<AlphaFindings>,
    pub recommendations: Vec<String>,
}

/// Build the report. No side effects.
pub fn generate_report(suite: &ValidationSuite) -> ValidationReport {
    ValidationReport {
        summary: ReportSummary {
            strategy_id: suite.strategy_id.clone(),
            total_tests: suite.total_tests,
            passed_tests: suite.passed_tests,
            failed_tests: suite.failed_tests,
            pass_rate_pct: suite.pass_rate * 100.0,
            duration_ms: suite.duration_ms,
            verdict: verdict(suite.overall_score).to_string(),
        },
        scores: ScoreBreakdown {
            overall_score: suite.overall_score,
            performance_score: suite.performance_score,
            risk_score: suite.risk_score,
            alpha_score: suite.alpha_findings.as_ref().map(|a| a.alpha_score),
            confidence: suite.alpha_findings.as_ref().map(|a| a.confidence),
            has_edge: suite.alpha_findings.as_ref().is_some_and(|a| a.has_edge),
        },
        regimes: regime_rows(suite),
        tests: suite
            .results
            .iter()
            .map(|r| TestRow {
                test_name: r.test_name.clone(),
                regime: r.regime().map(str::to_string),
                success: r.success,
                total_return_pct: r.metrics.total_return * 100.0,
                sharpe_ratio: r.metrics.sharpe_ratio,
                max_drawdown_pct: r.metrics.max_drawdown_pct(),
                win_rate: r.metrics.win_rate,
                total_trades: r.metrics.total_trades,
                execution_time_ms: r.execution_time_ms,
            })
            .collect(),
        failures: suite
            .failures()
            .map(|r| FailureRow {
                test_name: r.test_name.clone(),
                error_message: r.error_message.clone().unwrap_or_default(),
            })
            .collect(),
        alpha_findings: suite.alpha_findings.clone(),
        recommendations: recommendations(suite),
    }
}

fn verdict(overall_score: f64) -> &'static str {
    if overall_score >= 70.0 {
        "robust"
    } else if overall_score >= 40.0 {
        "promising"
    } else {
        "not ready"
    }
}

fn regime_rows(suite: &ValidationSuite) -> Vec<RegimeRow> {
    let mut grouped: BTreeMap<&str, Vec<&super::ValidationResult>> = BTreeMap::new();
    for result in &suite.results {
        grouped
            .entry(result.regime().unwrap_or("untagged"))
            .or_default()
            .push(result);
    }
    grouped
        .into_iter()
        .map(|(regime, results)| {
            let passed: Vec<_> = results.iter().filter(|r| r.success).collect();
            let sharpes: Vec<f64> = passed.iter().map(|r| r.metrics.sharpe_ratio).collect();
            let returns: Vec<f64> = passed.iter().map(|r| r.metrics.total_return * 100.0).collect();
            RegimeRow {
                regime: regime.to_string(),
                tests: results.len(),
                passed: passed.len(),
                mean_sharpe: mean_f64(&sharpes),
                mean_return_pct: mean_f64(&returns),
            }
        })
        .collect()
}

/// Informational threshold rules; nothing downstream branches on them.
fn recommendations(suite: &ValidationSuite) -> Vec<String> {
    let mut out = Vec::new();
    let score = suite.overall_score;

    out.push(match verdict(score) {
        "robust" => format!("Overall score {score:.1}: strategy looks robust across scenarios."),
        "promising" => format!("Overall score {score:.1}: promising, refine parameters and re-validate."),
        _ => format!("Overall score {score:.1}: not ready for deployment."),
    });

    if suite.pass_rate < 0.8 {
        out.push(format!(
            "Pass rate {:.0}% is below 80%: investigate the {} failed scenario(s).",
            suite.pass_rate * 100.0,
            suite.failed_tests
        ));
    }

    let passed: Vec<_> = suite.successful().collect();
    if !passed.is_empty() {
        let mean_dd = mean_f64(&passed.iter().map(|r| r.metrics.max_drawdown_pct()).collect::<Vec<_>>());
        if mean_dd > 20.0 {
            out.push(format!(
                "Mean max drawdown {mean_dd:.1}% exceeds 20%: tighten position sizing or add stops."
            ));
        }
        let mean_sharpe = mean_f64(&passed.iter().map(|r| r.metrics.sharpe_ratio).collect::<Vec<_>>());
        if mean_sharpe < 1.0 {
            out.push(format!(
                "Mean Sharpe {mean_sharpe:.2} is below 1.0: improve risk-adjusted returns."
            ));
        }
    }

    let stressed: Vec<_> = suite.results.iter().filter(|r| r.is_stress()).collect();
    if stressed.iter().any(|r| !r.success || r.metrics.total_return < 0.0) {
        out.push(
            "Stress scenarios fail or lose money: the edge is sensitive to costs or capital."
                .to_string(),
        );
    }

    match &suite.alpha_findings {
        None => out.push(
            "Alpha analysis skipped: too few scenarios passed to assess an edge.".to_string(),
        ),
        Some(alpha) => {
            if let Some(worst) = &alpha.worst_regime {
                if alpha.best_regime.as_ref() != Some(worst) {
                    out.push(format!(
                        "Weakest regime is '{worst}', strongest is '{}'.",
                        alpha.best_regime.as_deref().unwrap_or("-")
                    ));
                }
            }
        }
    }
    out
}

impl ValidationReport {
    pub fn to_markdown(&self) -> String {
        let s = &self.summary;
        let mut md = format!(
            "# EdgeLab Validation Report\n\n\
Strategy: `{}`\n\n\
## Summary\n\
- Verdict: {}\n\
- Tests: {} ({} passed, {} failed)\n\
- Pass Rate: {:.1}%\n\
- Duration: {} ms\n",
            s.strategy_id,
            s.verdict,
            s.total_tests,
            s.passed_tests,
            s.failed_tests,
            s.pass_rate_pct,
            s.duration_ms
        );

        md.push_str("\n## Scores\n");
        md.push_str(&format!("- Overall: {:.1}\n", self.scores.overall_score));
        md.push_str(&format!("- Performance: {:.1}\n", self.scores.performance_score));
        md.push_str(&format!("- Risk: {:.1}\n", self.scores.risk_score));
        match (&self.alpha_findings, self.scores.confidence) {
            (Some(alpha), Some(confidence)) => {
                md.push_str(&format!(
                    "- Alpha: {:.1} (confidence: {}, edge: {})\n",
                    alpha.alpha_score,
                    confidence.label(),
                    if alpha.has_edge { "yes" } else { "no" }
                ));
                let c = &alpha.components;
                md.push_str("\n| Component | Points |\n");
                md.push_str("|-----------|--------|\n");
                for (name, points) in [
                    ("Sharpe", c.sharpe),
                    ("Drawdown", c.drawdown),
                    ("Win rate", c.win_rate),
                    ("Profit factor", c.profit_factor),
                    ("Consistency", c.consistency),
                ] {
                    md.push_str(&format!("| {name} | {points:.1} |\n"));
                }
            }
            _ => md.push_str("- Alpha: not computed\n"),
        }

        if !self.regimes.is_empty() {
            md.push_str("\n## Regimes\n\n");
            md.push_str("| Regime | Tests | Passed | Mean Sharpe | Mean Return |\n");
            md.push_str("|--------|-------|--------|-------------|-------------|\n");
            for r in &self.regimes {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {:+.2}% |\n",
                    r.regime, r.tests, r.passed, r.mean_sharpe, r.mean_return_pct
                ));
            }
        }

        md.push_str("\n## Tests\n\n");
        md.push_str("| Test | Status | Return | Sharpe | Max DD | Trades |\n");
        md.push_str("|------|--------|--------|--------|--------|--------|\n");
        for t in &self.tests {
            md.push_str(&format!(
                "| {} | {} | {:+.2}% | {:.2} | {:.2}% | {} |\n",
                t.test_name,
                if t.success { "pass" } else { "FAIL" },
                t.total_return_pct,
                t.sharpe_ratio,
                t.max_drawdown_pct,
                t.total_trades
            ));
        }

        if !self.failures.is_empty() {
            md.push_str("\n## Failures\n\n");
            for f in &self.failures {
                md.push_str(&format!("- `{}`: {}\n", f.test_name, f.error_message));
            }
        }

        md.push_str("\n## Recommendations\n\n");
        for r in &self.recommendations {
            md.push_str(&format!("- {r}\n"));
        }
        md
    }
}
