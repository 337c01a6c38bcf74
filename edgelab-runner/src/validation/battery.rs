//! Validation battery: symbols × timeframes × regime windows, plus stress
//! variants on the base config.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use edgelab_core::data::Timeframe;
use serde::{Deserialize, Serialize};

use crate::config::{BacktestConfig, ValidationConfig};

/// Tag key carrying the regime label; stress variants use [`STRESS_REGIME`].
pub const REGIME_TAG: &str = "regime";
pub const STRESS_REGIME: &str = "stress";

/// One scenario of the battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationTest {
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_capital: f64,
    /// Overrides the base config when set.
    pub commission_rate: Option<f64>,
    pub slippage_rate: Option<f64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ValidationTest {
    pub fn regime(&self) -> Option<&str> {
        self.tags.get(REGIME_TAG).map(String::as_str)
    }

    pub fn is_stress(&self) -> bool {
        self.regime() == Some(STRESS_REGIME)
    }

    /// Backtest config for this scenario: the base with scenario fields applied.
    pub fn to_config(&self, base: &BacktestConfig) -> BacktestConfig {
        BacktestConfig {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            start_date: self.start,
            end_date: self.end,
            initial_capital: self.initial_capital,
            commission_rate: self.commission_rate.unwrap_or(base.commission_rate),
            slippage_rate: self.slippage_rate.unwrap_or(base.slippage_rate),
            ..base.clone()
        }
    }
}

/// Full battery for `base` under `validation`. Order is deterministic:
/// symbol, then timeframe, then regime, then the stress variants.
pub fn build_battery(base: &BacktestConfig, validation: &ValidationConfig) -> Vec<ValidationTest> {
    let mut tests = Vec::with_capacity(
        validation.symbols.len() * validation.timeframes.len() * validation.regimes.len() + 3,
    );

    for symbol in &validation.symbols {
        for &timeframe in &validation.timeframes {
            for regime in &validation.regimes {
                tests.push(ValidationTest {
                    name: format!("{symbol}_{timeframe}_{}", regime.name),
                    symbol: symbol.clone(),
                    timeframe,
                    start: regime.start,
                    end: regime.end,
                    initial_capital: base.initial_capital,
                    commission_rate: None,
                    slippage_rate: None,
                    tags: tags(&regime.name, None),
                });
            }
        }
    }

    if validation.stress.enabled {
        tests.extend(stress_variants(base, validation));
    }
    tests
}

fn stress_variants(base: &BacktestConfig, validation: &ValidationConfig) -> Vec<ValidationTest> {
    let stress = &validation.stress;
    let variant = |kind: &str| ValidationTest {
        name: format!("{}_{}_stress_{kind}", base.symbol, base.timeframe),
        symbol: base.symbol.clone(),
        timeframe: base.timeframe,
        start: base.start_date,
        end: base.end_date,
        initial_capital: base.initial_capital,
        commission_rate: None,
        slippage_rate: None,
        tags: tags(STRESS_REGIME, Some(kind)),
    };

    vec![
        ValidationTest {
            commission_rate: Some(base.commission_rate * stress.commission_multiplier),
            ..variant("high_commission")
        },
        ValidationTest {
            slippage_rate: Some(base.slippage_rate * stress.slippage_multiplier),
            ..variant("high_slippage")
        },
        ValidationTest {
            initial_capital: base.initial_capital * stress.capital_multiplier,
            ..variant("low_capital")
        },
    ]
}

fn tags(regime: &str, stress: Option<&str>) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::from([(REGIME_TAG.to_string(), regime.to_string())]);
    if let Some(kind) = stress {
        tags.insert("stress".to_string(), kind.to_string());
    }
    tags
}
