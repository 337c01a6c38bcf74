//! Validation pipeline — fans the battery out over a bounded worker pool.
//!
//! Every scenario gets its own provider, signal source and simulator; nothing
//! mutable crosses workers. A scenario that errors or panics becomes a failed
//! `ValidationResult` and the rest of the suite carries on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use edgelab_core::data::{BarSeriesProvider, CsvProvider, SyntheticParams, SyntheticProvider};
use edgelab_core::signals::{builtin_signal, SignalSource, BUILTIN_SIGNALS};

use super::battery::{build_battery, ValidationTest};
use super::scoring::{analyze_alpha, SuiteScores};
use super::{ValidationResult, ValidationSuite};
use crate::config::{BacktestConfig, ConfigError, ValidationConfig};
use crate::metrics::PortfolioMetrics;
use crate::risk_metrics::RiskMetrics;
use crate::runner::{panic_message, run_backtest, BacktestResult};

#[derive(Debug, Error)]
pub enum ValidationWorkerError {
    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("worker setup failed: {0}")]
    Setup(String),

    #[error("backtest failed: {0}")]
    Backtest(String),
}

/// Builds fresh collaborators for each scenario.
pub trait WorkerFactory: Send + Sync {
    fn provider(
        &self,
        test: &ValidationTest,
    ) -> Result<Box<dyn BarSeriesProvider>, ValidationWorkerError>;

    fn signal(&self, test: &ValidationTest)
        -> Result<Box<dyn SignalSource>, ValidationWorkerError>;
}

/// Where the built-in factory reads bars from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    Synthetic(SyntheticParams),
    CsvDir(PathBuf),
}

/// Factory over the built-in providers and signal sources.
#[derive(Debug, Clone)]
pub struct BuiltinWorkerFactory {
    data: DataSource,
    signal: String,
}

impl BuiltinWorkerFactory {
    pub fn new(data: DataSource, signal: &str) -> Result<Self, ConfigError> {
        if builtin_signal(signal).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown signal '{signal}', expected one of {}",
                BUILTIN_SIGNALS.join(", ")
            )));
        }
        Ok(Self {
            data,
            signal: signal.to_string(),
        })
    }
}

impl WorkerFactory for BuiltinWorkerFactory {
    fn provider(
        &self,
        _test: &ValidationTest,
    ) -> Result<Box<dyn BarSeriesProvider>, ValidationWorkerError> {
        Ok(match &self.data {
            DataSource::Synthetic(params) => Box::new(SyntheticProvider::new(*params)),
            DataSource::CsvDir(dir) => Box::new(CsvProvider::new(dir.clone())),
        })
    }

    fn signal(
        &self,
        _test: &ValidationTest,
    ) -> Result<Box<dyn SignalSource>, ValidationWorkerError> {
        builtin_signal(&self.signal)
            .ok_or_else(|| ValidationWorkerError::Setup(format!("unknown signal '{}'", self.signal)))
    }
}

pub struct ValidationPipeline {
    base: BacktestConfig,
    validation: ValidationConfig,
    factory: Box<dyn WorkerFactory>,
}

impl ValidationPipeline {
    pub fn new(
        base: BacktestConfig,
        validation: ValidationConfig,
        factory: Box<dyn WorkerFactory>,
    ) -> Self {
        Self {
            base,
            validation,
            factory,
        }
    }

    pub fn base(&self) -> &BacktestConfig {
        &self.base
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// The default battery for this pipeline's configs.
    pub fn battery(&self) -> Vec<ValidationTest> {
        build_battery(&self.base, &self.validation)
    }

    /// Run `tests` (default: the full battery) on at most `max_concurrency`
    /// workers (default: the config's cap, then available parallelism).
    /// Blocks until every scenario has finished or failed.
    pub fn run_validation_suite(
        &self,
        strategy_id: &str,
        tests: Option<Vec<ValidationTest>>,
        max_concurrency: Option<usize>,
    ) -> ValidationSuite {
        let started_at = Utc::now();
        let clock = Instant::now();
        let tests = tests.unwrap_or_else(|| self.battery());
        let workers = self.worker_count(max_concurrency, tests.len());
        let base = BacktestConfig {
            strategy_id: strategy_id.to_string(),
            ..self.base.clone()
        };

        info!(strategy = strategy_id, tests = tests.len(), workers, "validation suite started");

        let results: Vec<ValidationResult> =
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| {
                    tests
                        .par_iter()
                        .map(|test| self.run_worker(&base, test))
                        .collect()
                }),
                Err(err) => {
                    warn!(error = %err, "worker pool unavailable, running sequentially");
                    tests.iter().map(|test| self.run_worker(&base, test)).collect()
                }
            };

        let scores = SuiteScores::compute(&results);
        let alpha_findings = analyze_alpha(&results, self.validation.alpha_min_pass_rate);
        let passed_tests = results.iter().filter(|r| r.success).count();

        info!(
            strategy = strategy_id,
            passed = passed_tests,
            failed = results.len() - passed_tests,
            overall_score = scores.overall_score,
            alpha = alpha_findings.as_ref().map(|a| a.alpha_score),
            "validation suite complete"
        );

        ValidationSuite {
            strategy_id: strategy_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            concurrency: workers,
            total_tests: results.len(),
            passed_tests,
            failed_tests: results.len() - passed_tests,
            pass_rate: scores.pass_rate,
            performance_score: scores.performance_score,
            risk_score: scores.risk_score,
            overall_score: scores.overall_score,
            results,
            alpha_findings,
        }
    }

    fn worker_count(&self, requested: Option<usize>, tests: usize) -> usize {
        let cap = requested
            .or(self.validation.max_concurrency)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        cap.clamp(1, tests.max(1))
    }

    fn run_worker(&self, base: &BacktestConfig, test: &ValidationTest) -> ValidationResult {
        let clock = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(base, test)))
            .unwrap_or_else(|payload| {
                Err(ValidationWorkerError::Panicked(panic_message(payload.as_ref())))
            });
        let execution_time_ms = clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                info!(
                    test = %test.name,
                    sharpe = result.metrics.sharpe_ratio,
                    trades = result.metrics.total_trades,
                    execution_time_ms,
                    "validation test passed"
                );
                ValidationResult {
                    test_name: test.name.clone(),
                    success: true,
                    tags: test.tags.clone(),
                    metrics: result.metrics,
                    risk_metrics: result.risk_metrics,
                    execution_time_ms,
                    error_message: None,
                }
            }
            Err(err) => {
                warn!(test = %test.name, error = %err, "validation test failed");
                ValidationResult {
                    test_name: test.name.clone(),
                    success: false,
                    tags: test.tags.clone(),
                    metrics: PortfolioMetrics::neutral(test.initial_capital),
                    risk_metrics: RiskMetrics::default(),
                    execution_time_ms,
                    error_message: Some(err.to_string()),
                }
            }
        }
    }

    fn execute(
        &self,
        base: &BacktestConfig,
        test: &ValidationTest,
    ) -> Result<BacktestResult, ValidationWorkerError> {
        let config = test.to_config(base);
        let provider = self.factory.provider(test)?;
        let signal = self.factory.signal(test)?;
        let result = run_backtest(&config, provider.as_ref(), signal.as_ref());
        if result.success {
            Ok(result)
        } else {
            Err(ValidationWorkerError::Backtest(result.message))
        }
    }
}
