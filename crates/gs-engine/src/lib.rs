//! gs-engine
//!
//! Municipal grant allocation engine.
//! - Base amount from each municipality's reference value
//! - Need-proportional distribution of the residual budget
//! - Iterative minimum-amount floor with round-1 restoration
//! - Whole-unit rounding with exact-total reconciliation
//! - Pure deterministic logic (no IO, no time, no global state)

mod summary;
mod types;

pub mod engine;
pub mod fixedpoint;
pub mod rounding;
pub mod trace;

pub use engine::{
    compute, Allocation, AllocationEngine, AllocationError, Convergence, Diagnostic,
    RoundEntry, RoundSnapshot,
};
pub use fixedpoint::{Cents, CENTS_PER_UNIT};
pub use rounding::{round_and_reconcile, RoundingAdjustment, RoundingReport};
pub use summary::{validate_total, AllocationSummary, ValidationReport};
pub use trace::TraceLog;
pub use types::{
    AllocationResult, EngineConfig, MunicipalityRecord, Status, DEFAULT_BASE_PERCENT,
    DEFAULT_MAX_ROUNDS, DEFAULT_MINIMUM_AMOUNT, DEFAULT_VALIDATION_TOLERANCE, MAX_AMOUNT,
};

/// The ten-municipality sample data set shipped with the tool.
pub fn example_records() -> Vec<MunicipalityRecord> {
    [
        ("Stadt A", 50_000.0, 120.0),
        ("Stadt B", 35_000.0, 85.0),
        ("Gemeinde C", 15_000.0, 30.0),
        ("Gemeinde D", 8_000.0, 15.0),
        ("Stadt E", 45_000.0, 95.0),
        ("Gemeinde F", 12_000.0, 25.0),
        ("Stadt G", 60_000.0, 140.0),
        ("Gemeinde H", 5_000.0, 8.0),
        ("Stadt I", 40_000.0, 75.0),
        ("Gemeinde J", 18_000.0, 35.0),
    ]
    .into_iter()
    .map(|(name, value, need)| MunicipalityRecord::new(name, value, need))
    .collect()
}

/// Budget used with [`example_records`] when none is given.
pub const EXAMPLE_TOTAL_BUDGET: f64 = 500_000.0;
