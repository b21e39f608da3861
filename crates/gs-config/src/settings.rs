use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gs_engine::{
    EngineConfig, DEFAULT_BASE_PERCENT, DEFAULT_MAX_ROUNDS, DEFAULT_MINIMUM_AMOUNT,
    DEFAULT_VALIDATION_TOLERANCE,
};

pub const DEFAULT_EXPORTS_ROOT: &str = "exports";

/// Typed view of the merged config document. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub allocation: AllocationSettings,
    pub validation: ValidationSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationSettings {
    /// No default: must come from a config layer or the command line.
    pub total_budget: Option<f64>,
    pub minimum_amount: f64,
    pub base_percent: f64,
    pub max_rounds: u32,
    pub reject_negative_residual: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            total_budget: None,
            minimum_amount: DEFAULT_MINIMUM_AMOUNT,
            base_percent: DEFAULT_BASE_PERCENT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            reject_negative_residual: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub tolerance: f64,
    /// Turn a total mismatch into a failed run instead of a warning.
    pub fail_on_mismatch: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_VALIDATION_TOLERANCE,
            fail_on_mismatch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub root: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            root: DEFAULT_EXPORTS_ROOT.to_string(),
        }
    }
}

/// Command-line values that take precedence over config layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub total_budget: Option<f64>,
    pub minimum_amount: Option<f64>,
    pub base_percent: Option<f64>,
    pub max_rounds: Option<u32>,
    pub exports_root: Option<String>,
    pub fail_on_mismatch: bool,
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("invalid config values")
    }

    /// Apply command-line overrides in place.
    pub fn apply(&mut self, o: &Overrides) {
        if let Some(v) = o.total_budget {
            self.allocation.total_budget = Some(v);
        }
        if let Some(v) = o.minimum_amount {
            self.allocation.minimum_amount = v;
        }
        if let Some(v) = o.base_percent {
            self.allocation.base_percent = v;
        }
        if let Some(v) = o.max_rounds {
            self.allocation.max_rounds = v;
        }
        if let Some(v) = &o.exports_root {
            self.export.root = v.clone();
        }
        if o.fail_on_mismatch {
            self.validation.fail_on_mismatch = true;
        }
    }

    /// Engine parameters; range checks happen in the engine.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let Some(total_budget) = self.allocation.total_budget else {
            bail!(
                "CONFIG_MISSING_TOTAL_BUDGET: set allocation.total_budget in a config layer \
                 or pass --total-budget"
            );
        };

        Ok(EngineConfig::new(total_budget)
            .with_minimum_amount(self.allocation.minimum_amount)
            .with_base_percent(self.allocation.base_percent)
            .with_max_rounds(self.allocation.max_rounds)
            .with_reject_negative_residual(self.allocation.reject_negative_residual)
            .with_validation_tolerance(self.validation.tolerance))
    }
}
