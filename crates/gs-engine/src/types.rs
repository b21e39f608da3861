use serde::{Deserialize, Serialize};

use crate::fixedpoint::Cents;

/// Default guaranteed minimum payout per municipality.
pub const DEFAULT_MINIMUM_AMOUNT: f64 = 12_500.0;

/// Default share of the reference value paid out as base amount.
pub const DEFAULT_BASE_PERCENT: f64 = 0.5;

/// Default safety cap on redistribution rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Largest total budget or minimum amount accepted, in whole units.
pub const MAX_AMOUNT: f64 = 1e15;

/// Default tolerance for the post-computation total check.
pub const DEFAULT_VALIDATION_TOLERANCE: f64 = 0.01;

/// One municipality as supplied by the input layer.
///
/// `reference_value` is the historical funding basis; `need_count` is the
/// number of qualifying cases and may be fractional when imported data
/// carries decimals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityRecord {
    pub name: String,
    pub reference_value: f64,
    pub need_count: f64,
}

impl MunicipalityRecord {
    pub fn new<S: Into<String>>(name: S, reference_value: f64, need_count: f64) -> Self {
        Self {
            name: name.into(),
            reference_value,
            need_count,
        }
    }
}

/// Allocation parameters.
///
/// Built with [`EngineConfig::new`] and the `with_*` setters; validated when
/// an [`crate::AllocationEngine`] is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub total_budget: f64,
    pub minimum_amount: f64,
    /// Fraction in `[0, 1]`, not a percentage.
    pub base_percent: f64,
    pub max_rounds: u32,
    /// Fail instead of distributing negative need shares when base amounts
    /// alone exceed the remaining budget.
    pub reject_negative_residual: bool,
    pub validation_tolerance: f64,
}

impl EngineConfig {
    /// Config with the given budget and all other parameters at their defaults.
    pub fn new(total_budget: f64) -> Self {
        Self {
            total_budget,
            minimum_amount: DEFAULT_MINIMUM_AMOUNT,
            base_percent: DEFAULT_BASE_PERCENT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            reject_negative_residual: false,
            validation_tolerance: DEFAULT_VALIDATION_TOLERANCE,
        }
    }

    pub fn with_minimum_amount(mut self, minimum_amount: f64) -> Self {
        self.minimum_amount = minimum_amount;
        self
    }

    pub fn with_base_percent(mut self, base_percent: f64) -> Self {
        self.base_percent = base_percent;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_reject_negative_residual(mut self, reject: bool) -> Self {
        self.reject_negative_residual = reject;
        self
    }

    pub fn with_validation_tolerance(mut self, tolerance: f64) -> Self {
        self.validation_tolerance = tolerance;
        self
    }
}

/// How a municipality's final amount was determined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    /// Still active when the round cap was reached.
    Pending,
    /// Settled in the final free round (no floor applied).
    Ok,
    /// Fixed at the minimum amount in the given round.
    Floored { round: u32 },
    /// Dropped below the floor in a later round and was re-granted its
    /// round-1 subtotal.
    RoundOneRestored { value: f64 },
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Ok => "OK",
            Status::Floored { .. } => "FLOORED",
            Status::RoundOneRestored { .. } => "RESTORED",
        }
    }

    /// `true` for statuses that fix the record for all later rounds.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Status::Floored { .. } | Status::RoundOneRestored { .. })
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::Ok => write!(f, "OK"),
            Status::Floored { round } => write!(f, "floored at round {round}"),
            Status::RoundOneRestored { value } => {
                write!(f, "round-1 value restored ({value:.2})")
            }
        }
    }
}

/// Per-municipality output of one computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub name: String,
    pub reference_value: f64,
    pub need_count: f64,
    pub base_amount: f64,
    pub need_share: f64,
    /// Pre-floor, pre-rounding value of the round it was last computed in.
    pub subtotal: f64,
    /// Settled payout after rounding and reconciliation.
    pub final_amount: Cents,
    pub final_amount_unrounded: f64,
    pub status: Status,
    /// Set on the single record that absorbed the rounding delta.
    pub rounding_adjusted: bool,
    /// Round in which the record was fixed; 0 if it settled in the free round.
    pub round_settled: u32,
    pub first_round_subtotal: f64,
}

impl AllocationResult {
    /// Human-readable status, including the rounding-adjustment suffix.
    pub fn status_label(&self) -> String {
        if self.rounding_adjusted {
            format!("{} + rounding adjustment", self.status)
        } else {
            self.status.to_string()
        }
    }
}
