//! EdgeLab CLI — single backtests and validation suites.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config
//! - `validate` — run the multi-scenario validation battery and score it

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use edgelab_core::data::{BarSeriesProvider, CsvProvider, SyntheticProvider};
use edgelab_core::signals::{builtin_signal, BUILTIN_SIGNALS};
use edgelab_runner::{
    generate_report, run_backtest, save_run_artifacts, save_suite_artifacts, BacktestConfig,
    BacktestResult, BuiltinWorkerFactory, DataSource, ValidationConfig, ValidationPipeline,
    ValidationSuite,
};

#[derive(Parser)]
#[command(
    name = "edgelab",
    about = "EdgeLab CLI — backtest simulation and strategy validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DataArgs {
    /// Directory of `<SYMBOL>_<timeframe>.csv` files.
    #[arg(long, default_value = "data", conflicts_with = "synthetic")]
    data_dir: PathBuf,

    /// Use deterministic synthetic bars instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Built-in signal source: ma_cross, donchian.
    #[arg(long, default_value = "ma_cross")]
    signal: String,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

impl DataArgs {
    fn data_source(&self) -> DataSource {
        if self.synthetic {
            DataSource::Synthetic(Default::default())
        } else {
            DataSource::CsvDir(self.data_dir.clone())
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest from a TOML config file.
    Run {
        /// Path to a backtest TOML config.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Run the validation battery for a strategy and score it.
    Validate {
        /// Path to the base backtest TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Path to a validation TOML config. Defaults to the built-in battery.
        #[arg(long)]
        validation: Option<PathBuf>,

        /// Maximum concurrent workers.
        #[arg(long)]
        max_concurrency: Option<usize>,

        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, data } => run_cmd(&config, &data),
        Commands::Validate {
            config,
            validation,
            max_concurrency,
            data,
        } => validate_cmd(&config, validation.as_deref(), max_concurrency, &data),
    }
}

fn init_tracing() -> Result<()> {
    let filter = std::env::var("EDGELAB_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow::anyhow!("invalid log filter: {err}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run_cmd(config_path: &std::path::Path, data: &DataArgs) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let Some(signal) = builtin_signal(&data.signal) else {
        bail!(
            "unknown signal '{}'. Valid: {}",
            data.signal,
            BUILTIN_SIGNALS.join(", ")
        );
    };
    let provider: Box<dyn BarSeriesProvider> = match data.data_source() {
        DataSource::Synthetic(params) => Box::new(SyntheticProvider::new(params)),
        DataSource::CsvDir(dir) => Box::new(CsvProvider::new(dir)),
    };

    tracing::info!(
        strategy = %config.strategy_id,
        provider = provider.name(),
        signal = signal.name(),
        "starting backtest"
    );
    let result = run_backtest(&config, provider.as_ref(), signal.as_ref());
    print_run_summary(&result);

    let run_dir = save_run_artifacts(&result, &data.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    if !result.success {
        bail!("backtest failed: {}", result.message);
    }
    Ok(())
}

fn validate_cmd(
    config_path: &std::path::Path,
    validation_path: Option<&std::path::Path>,
    max_concurrency: Option<usize>,
    data: &DataArgs,
) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let validation = match validation_path {
        Some(path) => ValidationConfig::from_file(path)
            .with_context(|| format!("failed to load validation config {}", path.display()))?,
        None => ValidationConfig::default(),
    };
    if max_concurrency == Some(0) {
        bail!("--max-concurrency must be at least 1");
    }

    let factory = BuiltinWorkerFactory::new(data.data_source(), &data.signal)?;
    let strategy_id = config.strategy_id.clone();
    let pipeline = ValidationPipeline::new(config, validation, Box::new(factory));
    let suite = pipeline.run_validation_suite(&strategy_id, None, max_concurrency);
    let report = generate_report(&suite);

    print_suite_summary(&suite);
    println!();
    println!("--- Recommendations ---");
    for rec in &report.recommendations {
        println!("- {rec}");
    }

    let dir = save_suite_artifacts(&suite, &report, &data.output_dir)?;
    println!();
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn print_run_summary(result: &BacktestResult) {
    let c = &result.config;
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", c.strategy_id);
    println!("Symbol:         {} ({})", c.symbol, c.timeframe);
    println!("Period:         {} to {}", c.start_date, c.end_date);
    if !result.success {
        println!("Status:         FAILED ({:?})", result.failed_phase);
        println!("Error:          {}", result.message);
        return;
    }
    println!("Bars:           {}", result.bar_count);
    println!(
        "Signals:        {} generated, {} executed, {} rejected",
        result.signals_generated, result.signals_executed, result.rejected_orders
    );
    println!("Trades:         {}", m.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Calmar:         {:.3}", m.calmar_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("VaR 95%:        {:.2}%", result.risk_metrics.var_95 * 100.0);
}

fn print_suite_summary(suite: &ValidationSuite) {
    println!();
    println!("=== Validation Suite ===");
    println!("Strategy:       {}", suite.strategy_id);
    println!(
        "Tests:          {} ({} passed, {} failed) on {} workers",
        suite.total_tests, suite.passed_tests, suite.failed_tests, suite.concurrency
    );
    println!("Pass Rate:      {:.1}%", suite.pass_rate * 100.0);
    println!("Overall Score:  {:.1}", suite.overall_score);
    println!("Performance:    {:.1}", suite.performance_score);
    println!("Risk:           {:.1}", suite.risk_score);
    match &suite.alpha_findings {
        Some(alpha) => {
            println!(
                "Alpha Score:    {:.1} ({} confidence{})",
                alpha.alpha_score,
                alpha.confidence.label(),
                if alpha.has_edge { ", edge detected" } else { "" }
            );
            if let (Some(best), Some(worst)) = (&alpha.best_regime, &alpha.worst_regime) {
                println!("Regimes:        best {best}, worst {worst}");
            }
        }
        None => println!("Alpha Score:    not computed"),
    }
}
