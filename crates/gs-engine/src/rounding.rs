//! Rounding pass and exact-total reconciliation.
//!
//! Every settled amount is rounded to a whole currency unit.  Whatever the
//! rounded amounts lose or gain against the total budget is booked, in one
//! piece, onto the municipality holding the largest rounded amount (first
//! occurrence wins ties), provided the gap is at least one whole unit.

use serde::{Deserialize, Serialize};

use crate::fixedpoint::Cents;

/// What the reconciliation step did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundingReport {
    pub sum_unrounded: f64,
    /// Sum of the rounded amounts before any adjustment.
    pub sum_rounded: Cents,
    /// `total_budget - sum_rounded`.
    pub delta: Cents,
    pub adjustment: Option<RoundingAdjustment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingAdjustment {
    /// Index into the input order.
    pub index: usize,
    pub before: Cents,
    pub after: Cents,
}

/// Round `unrounded` amounts and reconcile them against `total_budget`.
///
/// Returns the settled amounts (same order as the input) and a report, or
/// `None` if an amount, their sum or the budget has no `i64` cent value.
pub fn round_and_reconcile(
    unrounded: &[f64],
    total_budget: f64,
) -> Option<(Vec<Cents>, RoundingReport)> {
    let mut rounded = unrounded
        .iter()
        .map(|a| Cents::round_to_unit(*a))
        .collect::<Option<Vec<Cents>>>()?;

    let sum_unrounded: f64 = unrounded.iter().sum();
    let sum_rounded = rounded
        .iter()
        .try_fold(Cents::ZERO, |acc, c| acc.checked_add(*c))?;
    let delta = Cents::checked_from_f64(total_budget)?.checked_sub(sum_rounded)?;

    let mut adjustment = None;
    if delta.abs() >= Cents::ONE_UNIT {
        if let Some(index) = largest_index(&rounded) {
            let before = rounded[index];
            rounded[index] = before.checked_add(delta)?;
            adjustment = Some(RoundingAdjustment {
                index,
                before,
                after: rounded[index],
            });
        }
    }

    Some((
        rounded,
        RoundingReport {
            sum_unrounded,
            sum_rounded,
            delta,
            adjustment,
        },
    ))
}

/// Index of the largest amount; the first one wins on ties.
fn largest_index(amounts: &[Cents]) -> Option<usize> {
    let mut best: Option<(usize, Cents)> = None;
    for (i, a) in amounts.iter().enumerate() {
        match best {
            Some((_, b)) if *a <= b => {}
            _ => best = Some((i, *a)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_thirds_put_remainder_on_first_largest() {
        let third = 100.0 / 3.0;
        let (rounded, report) = round_and_reconcile(&[third, third, third], 100.0).unwrap();
        assert_eq!(
            rounded,
            vec![Cents::from_units(34), Cents::from_units(33), Cents::from_units(33)]
        );
        assert_eq!(report.sum_rounded, Cents::from_units(99));
        assert_eq!(report.delta, Cents::from_units(1));
        assert_eq!(
            report.adjustment,
            Some(RoundingAdjustment {
                index: 0,
                before: Cents::from_units(33),
                after: Cents::from_units(34),
            })
        );
    }

    #[test]
    fn target_is_chosen_after_rounding() {
        // 10.4 and 10.6 are close before rounding; after rounding 11 > 10.
        let (rounded, report) = round_and_reconcile(&[10.4, 10.6, 5.0], 27.0).unwrap();
        assert_eq!(report.delta, Cents::from_units(1));
        assert_eq!(report.adjustment.as_ref().map(|a| a.index), Some(1));
        assert_eq!(rounded[1], Cents::from_units(12));
    }

    #[test]
    fn negative_delta_reduces_largest() {
        let (rounded, report) = round_and_reconcile(&[50.5, 49.5, 1.0], 99.0).unwrap();
        // 50.5 -> 50 (ties to even), 49.5 -> 50, 1 -> 1  => 101
        assert_eq!(report.sum_rounded, Cents::from_units(101));
        assert_eq!(report.delta, Cents::from_units(-2));
        assert_eq!(rounded, vec![Cents::from_units(48), Cents::from_units(50), Cents::from_units(1)]);
    }

    #[test]
    fn sub_unit_delta_is_left_alone() {
        let (rounded, report) = round_and_reconcile(&[500.0, 500.0], 1000.5).unwrap();
        assert_eq!(report.delta, Cents::new(50));
        assert!(report.adjustment.is_none());
        assert_eq!(rounded, vec![Cents::from_units(500), Cents::from_units(500)]);
    }

    #[test]
    fn exact_sum_needs_no_adjustment() {
        let (_, report) = round_and_reconcile(&[335_000.0, 165_000.0], 500_000.0).unwrap();
        assert_eq!(report.delta, Cents::ZERO);
        assert!(report.adjustment.is_none());
    }

    #[test]
    fn out_of_range_amounts_are_reported_not_wrapped() {
        // Each amount fits on its own; the sum of cents does not.
        assert!(round_and_reconcile(&[5e16, 5e16], 1e17).is_none());
        assert!(round_and_reconcile(&[1e17, 1.0], 1e17).is_none());
        assert!(round_and_reconcile(&[1.0, 2.0], f64::INFINITY).is_none());
    }
}
