//! Fixed-point money type for settled payouts.
//!
//! # Motivation
//!
//! The allocation rounds are computed in `f64` (proportional shares of a
//! residual budget are real-valued), but the settled payouts must add up to
//! the total budget exactly.  Summing rounded `f64` values drifts; summing
//! integers does not.
//!
//! `Cents` wraps an `i64` count of the smallest currency unit (1/100 of a
//! whole unit) so that:
//! - rounding reconciliation is exact integer arithmetic;
//! - settled amounts cannot be mixed with unrelated integers (no `From<i64>`).
//!
//! # Scale
//!
//! 1 whole currency unit = `Cents(100)`.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Number of cents in one whole currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

// ---------------------------------------------------------------------------
// Cents newtype
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount in cents.
///
/// Use [`Cents::new`] for explicit construction from a raw cent count, or one
/// of the `from_*` conversions when crossing over from `f64` round values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero monetary amount.
    pub const ZERO: Cents = Cents(0);

    /// One whole currency unit.
    pub const ONE_UNIT: Cents = Cents(CENTS_PER_UNIT);

    /// Construct from a raw cent count.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Construct from a whole number of currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Cents(units * CENTS_PER_UNIT)
    }

    /// Extract the underlying raw cent count.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert a real-valued amount to the nearest cent (ties to even).
    ///
    /// Non-finite input saturates through the `as` cast (NaN becomes zero);
    /// callers validate their inputs before reaching this point.
    #[inline]
    pub fn from_f64(amount: f64) -> Self {
        Cents((amount * CENTS_PER_UNIT as f64).round_ties_even() as i64)
    }

    /// Like [`Cents::from_f64`], but `None` when the amount is not finite or
    /// does not fit in `i64` cents.
    #[inline]
    pub fn checked_from_f64(amount: f64) -> Option<Self> {
        let cents = (amount * CENTS_PER_UNIT as f64).round_ties_even();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Cents(cents as i64))
    }

    /// Round a real-valued amount to the nearest whole currency unit.
    ///
    /// Halves go to the even unit (`2.5 → 2`, `3.5 → 4`), which is how the
    /// payout tables have always been rounded.
    ///
    /// Returns `None` if the amount is not finite or its cent value does not
    /// fit in `i64`.
    #[inline]
    pub fn round_to_unit(amount: f64) -> Option<Self> {
        let units = amount.round_ties_even();
        if !units.is_finite() {
            return None;
        }
        // `as` saturates; the multiplication then reports the overflow.
        (units as i64).checked_mul(CENTS_PER_UNIT).map(Cents)
    }

    /// The amount as a real number of currency units.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    /// Absolute value.  `Cents(i64::MIN).abs()` saturates.
    #[inline]
    pub fn abs(self) -> Cents {
        Cents(self.0.saturating_abs())
    }

    /// `true` if the amount carries no fractional cents beyond whole units.
    #[inline]
    pub fn is_whole_unit(self) -> bool {
        self.0 % CENTS_PER_UNIT == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

// ---------------------------------------------------------------------------
// Arithmetic (closed over Cents)
// ---------------------------------------------------------------------------

impl Add for Cents {
    type Output = Cents;
    #[inline]
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / CENTS_PER_UNIT;
        let frac = (self.0 % CENTS_PER_UNIT).abs();
        // -0.50 would otherwise print as 0.50.
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{frac:02}")
        } else {
            write!(f, "{units}.{frac:02}")
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
