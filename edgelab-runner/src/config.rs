//! Serializable run and validation configuration.
//!
//! Both configs load from TOML with every field defaulted, so a file only
//! needs the values it changes.

use chrono::NaiveDate;
use edgelab_core::data::Timeframe;
use edgelab_core::domain::OrderSide;
use edgelab_core::engine::{SimulatorConfig, SizingLimits};
use edgelab_core::signals::StrategyParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which side a run trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    #[default]
    Long,
    Short,
}

impl TradeDirection {
    /// Side of the order that opens exposure.
    pub fn entry_side(self) -> OrderSide {
        match self {
            TradeDirection::Long => OrderSide::Buy,
            TradeDirection::Short => OrderSide::Sell,
        }
    }
}

/// Configuration for a single backtest run. One config plus deterministic
/// inputs gives one deterministic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub strategy_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Fraction of notional, e.g. 0.001 = 10 bps.
    pub commission_rate: f64,
    /// Fraction of price.
    pub slippage_rate: f64,
    pub max_position_size_pct: f64,
    pub risk_per_trade_pct: f64,
    pub max_total_exposure_pct: f64,
    pub assumed_stop_distance_pct: f64,
    /// Annual, as a fraction.
    pub risk_free_rate: f64,
    pub trade_direction: TradeDirection,
    pub benchmark_symbol: Option<String>,
    pub min_bars: usize,
    pub parameters: StrategyParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            strategy_id: "unnamed".into(),
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::D1,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            initial_capital: 10_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            max_position_size_pct: 10.0,
            risk_per_trade_pct: 2.0,
            max_total_exposure_pct: 100.0,
            assumed_stop_distance_pct: 2.0,
            risk_free_rate: 0.02,
            trade_direction: TradeDirection::Long,
            benchmark_symbol: None,
            min_bars: 2,
            parameters: StrategyParams::new(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.symbol.trim().is_empty() {
            return invalid("symbol is empty".into());
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return invalid(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            ));
        }
        for (name, value) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
            ("risk_free_rate", self.risk_free_rate),
        ] {
            if !value.is_finite() || (name != "risk_free_rate" && value < 0.0) {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        for (name, value) in [
            ("max_position_size_pct", self.max_position_size_pct),
            ("risk_per_trade_pct", self.risk_per_trade_pct),
            ("max_total_exposure_pct", self.max_total_exposure_pct),
            ("assumed_stop_distance_pct", self.assumed_stop_distance_pct),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return invalid(format!("{name} must be in (0, 100], got {value}"));
            }
        }
        if self.start_date > self.end_date {
            return invalid(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            ));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig::new(self.initial_capital)
            .with_costs(self.commission_rate, self.slippage_rate)
            .with_limits(SizingLimits {
                max_position_size_pct: self.max_position_size_pct,
                max_total_exposure_pct: self.max_total_exposure_pct,
                assumed_stop_distance_pct: self.assumed_stop_distance_pct,
            })
    }
}

/// Labeled historical window used to stratify validation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeWindow {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RegimeWindow {
    pub fn new(name: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Self {
        Self {
            name: name.to_string(),
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap_or_default(),
        }
    }
}

/// Elevated-cost and reduced-capital variants appended to the battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub enabled: bool,
    pub commission_multiplier: f64,
    pub slippage_multiplier: f64,
    pub capital_multiplier: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            commission_multiplier: 5.0,
            slippage_multiplier: 5.0,
            capital_multiplier: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub regimes: Vec<RegimeWindow>,
    pub stress: StressConfig,
    /// Worker cap; `None` uses available parallelism.
    pub max_concurrency: Option<usize>,
    /// Minimum pass rate (fraction) for alpha analysis.
    pub alpha_min_pass_rate: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC/USDT".into(), "ETH/USDT".into(), "SOL/USDT".into()],
            timeframes: vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
            regimes: vec![
                RegimeWindow::new("bull", (2023, 10, 1), (2024, 3, 31)),
                RegimeWindow::new("bear", (2022, 4, 1), (2022, 11, 30)),
                RegimeWindow::new("sideways", (2023, 4, 1), (2023, 9, 30)),
                RegimeWindow::new("volatile", (2021, 5, 1), (2021, 7, 31)),
            ],
            stress: StressConfig::default(),
            max_concurrency: None,
            alpha_min_pass_rate: 0.5,
        }
    }
}

impl ValidationConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() || self.timeframes.is_empty() || self.regimes.is_empty() {
            return Err(ConfigError::Invalid(
                "validation needs at least one symbol, timeframe and regime".into(),
            ));
        }
        if let Some(regime) = self.regimes.iter().find(|r| r.start > r.end) {
            return Err(ConfigError::Invalid(format!(
                "regime '{}' starts after it ends",
                regime.name
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid("max_concurrency must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.alpha_min_pass_rate) {
            return Err(ConfigError::Invalid(
                "alpha_min_pass_rate must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
            strategy_id = "sma-20-50"
            symbol = "ETH/USDT"
            timeframe = "4h"
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy_id, "sma-20-50");
        assert_eq!(config.timeframe, Timeframe::H4);
        assert_eq!(config.max_position_size_pct, 10.0);
        assert_eq!(config.trade_direction, TradeDirection::Long);
    }

    #[test]
    fn parameters_table_parses() {
        let config = BacktestConfig::from_toml(
            r#"
            trade_direction = "short"
            start_date = "2024-01-01"
            end_date = "2024-02-01"

            [parameters]
            fast_period = 5
            slow_period = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.parameters["fast_period"], serde_json::json!(5));
        assert_eq!(config.trade_direction.entry_side(), OrderSide::Sell);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.initial_capital = 1_000.0;
        config.max_position_size_pct = 150.0;
        assert!(config.validate().is_err());

        config.max_position_size_pct = 10.0;
        config.commission_rate = -0.1;
        assert!(config.validate().is_err());

        config.commission_rate = 0.0;
        config.start_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_hash_deterministic_and_sensitive() {
        let a = BacktestConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash(), b.config_hash());
        assert_eq!(a.config_hash().len(), 64);
        b.commission_rate = 0.002;
        assert_ne!(a.config_hash(), b.config_hash());
    }

    #[test]
    fn validation_config_toml() {
        let config = ValidationConfig::from_toml(
            r#"
            symbols = ["BTC/USDT"]
            timeframes = ["1d"]
            max_concurrency = 2

            [[regimes]]
            name = "bull"
            start = "2023-10-01"
            end = "2024-03-31"

            [stress]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.regimes.len(), 1);
        assert!(!config.stress.enabled);
        assert_eq!(config.stress.commission_multiplier, 5.0);
    }

    #[test]
    fn validation_config_rejects_zero_workers() {
        let config = ValidationConfig {
            max_concurrency: Some(0),
            ..ValidationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/edgelab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
