//! EdgeLab Runner — backtest orchestration, metrics, validation and scoring.
//!
//! This crate builds on `edgelab-core` to provide:
//! - TOML configuration for single runs and validation batteries
//! - The backtest orchestrator (load, signal, simulate, measure)
//! - Performance and risk metrics over a finished run
//! - Multi-scenario validation on a bounded worker pool, with alpha scoring
//! - JSON/CSV/Markdown artifact export

pub mod config;
pub mod export;
pub mod metrics;
pub mod risk_metrics;
pub mod runner;
pub mod validation;

pub use config::{
    BacktestConfig, ConfigError, RegimeWindow, StressConfig, TradeDirection, ValidationConfig,
};
pub use export::{save_run_artifacts, save_suite_artifacts};
pub use metrics::{DrawdownPoint, EquityPoint, PortfolioMetrics};
pub use risk_metrics::RiskMetrics;
pub use runner::{run_backtest, BacktestError, BacktestResult, RunPhase};
pub use validation::{
    build_battery, generate_report, AlphaFindings, BuiltinWorkerFactory, ConfidenceGrade,
    DataSource, ValidationPipeline, ValidationReport, ValidationResult, ValidationSuite,
    ValidationTest, WorkerFactory,
};
