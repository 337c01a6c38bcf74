//! BDD scenarios for the validation pipeline and alpha scoring.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use edgelab_core::data::{BarSeriesProvider, InMemoryProvider, SyntheticParams, Timeframe};
use edgelab_core::domain::Bar;
use edgelab_core::signals::{FnSignalSource, SignalSource};
use edgelab_runner::validation::pool::ValidationWorkerError;
use edgelab_runner::{
    generate_report, BacktestConfig, BuiltinWorkerFactory, DataSource, ValidationConfig,
    ValidationPipeline, ValidationTest, WorkerFactory,
};

const SYM: &str = "BTC/USDT";

fn trending_bars() -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..60)
        .map(|i| Bar::flat(t0 + Duration::days(i), 100.0 + i as f64 + 3.0 * ((i as f64) / 3.0).sin()))
        .collect()
}

fn test_case(i: usize, regime: &str) -> ValidationTest {
    ValidationTest {
        name: format!("case_{i}"),
        symbol: SYM.into(),
        timeframe: Timeframe::D1,
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        initial_capital: 10_000.0,
        commission_rate: None,
        slippage_rate: None,
        tags: BTreeMap::from([("regime".to_string(), regime.to_string())]),
    }
}

/// Serves a fixed trending series; panics for the named scenarios.
struct ScriptedFactory {
    panic_on: Vec<String>,
    built: Arc<AtomicUsize>,
}

impl WorkerFactory for ScriptedFactory {
    fn provider(
        &self,
        test: &ValidationTest,
    ) -> Result<Box<dyn BarSeriesProvider>, ValidationWorkerError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        if self.panic_on.contains(&test.name) {
            panic!("worker for {} crashed", test.name);
        }
        Ok(Box::new(
            InMemoryProvider::new().with_series(SYM, Timeframe::D1, trending_bars()),
        ))
    }

    fn signal(&self, _test: &ValidationTest) -> Result<Box<dyn SignalSource>, ValidationWorkerError> {
        Ok(Box::new(FnSignalSource::at_indices(vec![5, 30], vec![20, 50])))
    }
}

fn base() -> BacktestConfig {
    BacktestConfig {
        symbol: SYM.into(),
        timeframe: Timeframe::D1,
        ..BacktestConfig::default()
    }
}

#[test]
fn bdd_suite_survives_three_crashing_workers() {
    // GIVEN 10 scenarios where 3 workers panic
    let tests: Vec<ValidationTest> = (0..10)
        .map(|i| test_case(i, if i % 2 == 0 { "bull" } else { "bear" }))
        .collect();
    let factory = ScriptedFactory {
        panic_on: vec!["case_1".into(), "case_4".into(), "case_8".into()],
        built: Arc::default(),
    };
    let pipeline = ValidationPipeline::new(base(), ValidationConfig::default(), Box::new(factory));

    // WHEN the suite runs on 4 workers
    let suite = pipeline.run_validation_suite("crashy", Some(tests), Some(4));

    // THEN the suite completes with the failures recorded
    assert_eq!(suite.total_tests, 10);
    assert_eq!(suite.failed_tests, 3);
    assert_eq!(suite.passed_tests, 7);
    assert!((suite.pass_rate - 0.7).abs() < 1e-12);
    assert_eq!(suite.concurrency, 4);

    // AND failed results are in submission order with their panic message
    let failed: Vec<&str> = suite.failures().map(|r| r.test_name.as_str()).collect();
    assert_eq!(failed, vec!["case_1", "case_4", "case_8"]);
    let msg = suite.results[1].error_message.as_deref().unwrap();
    assert!(msg.contains("worker panicked"), "{msg}");
    assert!(msg.contains("case_1 crashed"), "{msg}");
    assert_eq!(suite.results[1].metrics.final_value, 10_000.0);

    // AND alpha analysis ran, since 70% >= 50%
    let alpha = suite.alpha_findings.as_ref().expect("alpha computed");
    assert_eq!(alpha.samples, 7);
    assert!((0.0..=100.0).contains(&alpha.alpha_score));
    assert!(alpha.regime_performance.contains_key("bull"));
    assert!(alpha.regime_performance.contains_key("bear"));

    // AND the report lists the failures
    let report = generate_report(&suite);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.tests.len(), 10);
}

#[test]
fn bdd_majority_failure_skips_alpha() {
    // GIVEN 4 scenarios where 3 workers panic
    let tests: Vec<ValidationTest> = (0..4).map(|i| test_case(i, "sideways")).collect();
    let factory = ScriptedFactory {
        panic_on: vec!["case_0".into(), "case_1".into(), "case_2".into()],
        built: Arc::default(),
    };
    let pipeline = ValidationPipeline::new(base(), ValidationConfig::default(), Box::new(factory));

    // WHEN the suite runs
    let suite = pipeline.run_validation_suite("fragile", Some(tests), Some(2));

    // THEN scores are computed but alpha is not
    assert_eq!(suite.passed_tests, 1);
    assert!(suite.alpha_findings.is_none());
    assert!(suite.overall_score >= 0.0);
    let report = generate_report(&suite);
    assert!(report.recommendations.iter().any(|r| r.contains("Alpha analysis skipped")));
}

#[test]
fn bdd_each_scenario_gets_fresh_collaborators() {
    // GIVEN a factory counting the providers it builds
    let tests: Vec<ValidationTest> = (0..6).map(|i| test_case(i, "bull")).collect();
    let built = Arc::new(AtomicUsize::new(0));
    let factory = ScriptedFactory {
        panic_on: vec![],
        built: Arc::clone(&built),
    };
    let pipeline = ValidationPipeline::new(base(), ValidationConfig::default(), Box::new(factory));

    // WHEN the suite runs
    let suite = pipeline.run_validation_suite("isolated", Some(tests), Some(3));

    // THEN one provider was built per scenario
    assert_eq!(built.load(Ordering::SeqCst), 6);
    // AND every scenario passed with identical results on identical inputs
    assert_eq!(suite.passed_tests, 6);
    let first = &suite.results[0].metrics;
    assert!(suite.results.iter().all(|r| &r.metrics == first));
    assert!(suite.alpha_findings.as_ref().unwrap().sharpe_std.abs() < 1e-12);
}

#[test]
fn bdd_default_battery_on_synthetic_data() {
    // GIVEN a synthetic data source and the ma_cross signal on a daily-only battery
    let validation = ValidationConfig {
        symbols: vec!["BTC/USDT".into(), "ETH/USDT".into()],
        timeframes: vec![Timeframe::D1],
        ..ValidationConfig::default()
    };
    let factory =
        BuiltinWorkerFactory::new(DataSource::Synthetic(SyntheticParams::default()), "ma_cross")
            .unwrap();
    let pipeline = ValidationPipeline::new(base(), validation, Box::new(factory));

    // WHEN the default battery runs
    let suite = pipeline.run_validation_suite("sma-default", None, Some(2));

    // THEN 2 symbols x 1 timeframe x 4 regimes + 3 stress variants ran
    assert_eq!(suite.total_tests, 11);
    assert_eq!(suite.passed_tests, 11);
    assert_eq!(
        suite.results.iter().filter(|r| r.is_stress()).count(),
        3
    );
    let alpha = suite.alpha_findings.as_ref().unwrap();
    assert!(alpha.regime_performance.contains_key("stress"));
    assert!(alpha.best_regime.is_some());
    assert!(generate_report(&suite).to_markdown().contains("## Regimes"));
}
