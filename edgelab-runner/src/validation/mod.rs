//! Multi-scenario validation and alpha scoring.
//!
//! A battery of independent backtests (symbols × timeframes × regimes plus
//! stress variants) runs on a bounded worker pool. Each scenario's outcome is
//! a `ValidationResult`; the suite reduces them into pass rate, composite
//! scores and, when enough scenarios pass, an alpha assessment.

pub mod battery;
pub mod pool;
pub mod report;
pub mod scoring;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use battery::{build_battery, ValidationTest, REGIME_TAG, STRESS_REGIME};
pub use pool::{
    BuiltinWorkerFactory, DataSource, ValidationPipeline, ValidationWorkerError, WorkerFactory,
};
pub use report::{generate_report, ValidationReport};
pub use scoring::{AlphaComponents, AlphaFindings, ConfidenceGrade, SuiteScores};

use crate::metrics::PortfolioMetrics;
use crate::risk_metrics::RiskMetrics;

/// Outcome of one scenario. Failed scenarios carry neutral metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub test_name: String,
    pub success: bool,
    pub tags: BTreeMap<String, String>,
    pub metrics: PortfolioMetrics,
    pub risk_metrics: RiskMetrics,
    pub execution_time_ms: u64,
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn regime(&self) -> Option<&str> {
        self.tags.get(REGIME_TAG).map(String::as_str)
    }

    pub fn is_stress(&self) -> bool {
        self.regime() == Some(STRESS_REGIME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSuite {
    pub strategy_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Worker threads actually used.
    pub concurrency: usize,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    /// Fraction in [0, 1].
    pub pass_rate: f64,
    pub performance_score: f64,
    pub risk_score: f64,
    pub overall_score: f64,
    /// Submission order.
    pub results: Vec<ValidationResult>,
    /// `None` when too few scenarios passed.
    pub alpha_findings: Option<AlphaFindings>,
}

impl ValidationSuite {
    pub fn successful(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
