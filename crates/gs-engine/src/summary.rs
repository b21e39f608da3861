use serde::{Deserialize, Serialize};

use crate::fixedpoint::Cents;
use crate::types::AllocationResult;

/// Aggregate figures over one allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub count: usize,
    pub grand_total: Cents,
    /// Mean settled payout; `0.0` for an empty result set.
    pub mean: f64,
    pub smallest: Cents,
    pub largest: Cents,
    /// Records whose final amount is exactly the minimum amount.
    pub at_minimum: usize,
    pub minimum_amount: f64,
}

impl AllocationSummary {
    pub fn from_results(results: &[AllocationResult], minimum_amount: f64) -> Self {
        let grand_total: Cents = results.iter().map(|r| r.final_amount).sum();
        let count = results.len();
        let mean = if count == 0 {
            0.0
        } else {
            grand_total.to_f64() / count as f64
        };
        let min_cents = Cents::from_f64(minimum_amount);

        Self {
            count,
            grand_total,
            mean,
            smallest: results.iter().map(|r| r.final_amount).min().unwrap_or_default(),
            largest: results.iter().map(|r| r.final_amount).max().unwrap_or_default(),
            at_minimum: results.iter().filter(|r| r.final_amount == min_cents).count(),
            minimum_amount,
        }
    }
}

/// Outcome of the post-computation total check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub expected: f64,
    pub actual: f64,
    /// `actual - expected`.
    pub difference: f64,
    pub tolerance: f64,
    pub ok: bool,
}

/// Compare the settled total against `total_budget`.
///
/// `ok` iff `|actual - expected| <= tolerance`.  Never fails the computation;
/// callers decide what a mismatch means.
pub fn validate_total(
    results: &[AllocationResult],
    total_budget: f64,
    tolerance: f64,
) -> ValidationReport {
    let actual: Cents = results.iter().map(|r| r.final_amount).sum();
    let difference = actual.to_f64() - total_budget;

    ValidationReport {
        expected: total_budget,
        actual: actual.to_f64(),
        difference,
        tolerance,
        ok: difference.abs() <= tolerance,
    }
}
