//! gs-engine: iterative allocation engine
//!
//! Responsibilities (pure, no IO):
//! - Validate the allocation parameters and the municipality records.
//! - Run the redistribution rounds until no municipality drops below the
//!   minimum amount (or the round cap is hit).
//! - Round and reconcile the settled amounts so that they add up to the
//!   total budget.
//! - Produce an [`Allocation`]: per-municipality results in input order, a
//!   plain-text trace and any diagnostics.
//!
//! Design notes:
//! - Each round is computed by [`AllocationEngine::compute_round`] into an
//!   immutable [`RoundSnapshot`]; the snapshot is then merged into the working
//!   table.  Nothing a round computes can leak into another round except
//!   through that merge.
//! - The set of fixed municipalities is an explicit `BTreeSet` of input
//!   indices threaded through the loop.
//! - Round arithmetic is `f64`; only the rounding pass switches to
//!   [`Cents`](crate::fixedpoint::Cents).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rounding::{round_and_reconcile, RoundingReport};
use crate::summary::{validate_total, AllocationSummary, ValidationReport};
use crate::trace::TraceLog;
use crate::types::{AllocationResult, EngineConfig, MunicipalityRecord, Status, MAX_AMOUNT};

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors produced before or during an allocation run.
#[derive(Clone, Debug, PartialEq)]
pub enum AllocationError {
    /// A config scalar is out of range or not finite.
    InvalidConfiguration { field: &'static str, reason: String },
    /// No municipalities were supplied.
    EmptyInput,
    /// A municipality record carries an empty name or an invalid number.
    InvalidRecord { index: usize, name: String, reason: String },
    /// Base amounts exceed the remaining budget and the config rejects that.
    NegativeResidual { round: u32, residual_budget: f64 },
    /// A settled amount or the settled total has no exact cent value.
    AmountOutOfRange,
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration { field, reason } => {
                write!(f, "invalid configuration: {field} {reason}")
            }
            Self::EmptyInput => write!(f, "no municipalities supplied"),
            Self::InvalidRecord {
                index,
                name,
                reason,
            } => write!(f, "invalid municipality #{index} '{name}': {reason}"),
            Self::NegativeResidual {
                round,
                residual_budget,
            } => write!(
                f,
                "round {round}: base amounts exceed the remaining budget \
                 (residual {residual_budget:.2})"
            ),
            Self::AmountOutOfRange => {
                write!(f, "settled amounts are too large to round to whole cents")
            }
        }
    }
}

impl std::error::Error for AllocationError {}

// ─── Outcome types ───────────────────────────────────────────────────────────

/// Whether the rounds settled before the cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Convergence {
    Converged { rounds: u32 },
    /// The cap was reached while municipalities were still being fixed; the
    /// last computed state was used as-is.
    RoundCapReached { rounds: u32 },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn rounds(&self) -> u32 {
        match self {
            Convergence::Converged { rounds } | Convergence::RoundCapReached { rounds } => *rounds,
        }
    }
}

/// Non-fatal conditions worth surfacing to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Base amounts exceeded the available budget.
    NegativeResidual { round: u32, residual_budget: f64 },
    RoundCapReached { rounds: u32, still_active: usize },
    /// The settled total differs from the budget by more than the tolerance.
    TotalMismatch { expected: f64, actual: f64 },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::NegativeResidual {
                round,
                residual_budget,
            } => write!(
                f,
                "round {round}: residual budget is negative ({residual_budget:.2}); \
                 base amounts exceed the available budget"
            ),
            Diagnostic::RoundCapReached {
                rounds,
                still_active,
            } => write!(
                f,
                "round cap {rounds} reached with {still_active} municipality(ies) still active"
            ),
            Diagnostic::TotalMismatch { expected, actual } => write!(
                f,
                "settled total {actual:.2} differs from budget {expected:.2}"
            ),
        }
    }
}

/// Complete output of one computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub config: EngineConfig,
    /// One entry per input record, in input order.
    pub results: Vec<AllocationResult>,
    pub trace: TraceLog,
    pub convergence: Convergence,
    pub rounding: RoundingReport,
    pub validation: ValidationReport,
    pub diagnostics: Vec<Diagnostic>,
}

impl Allocation {
    pub fn result(&self, name: &str) -> Option<&AllocationResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn rounds(&self) -> u32 {
        self.convergence.rounds()
    }

    pub fn summary(&self) -> AllocationSummary {
        AllocationSummary::from_results(&self.results, self.config.minimum_amount)
    }

    /// The `(results, trace_log)` pair.
    pub fn into_parts(self) -> (Vec<AllocationResult>, TraceLog) {
        (self.results, self.trace)
    }
}

// ─── Round snapshot ──────────────────────────────────────────────────────────

/// Everything one round computed, before it is merged.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot {
    pub round: u32,
    pub fixed_total: f64,
    pub available_budget: f64,
    pub base_sum: f64,
    pub residual_budget: f64,
    pub need_sum: f64,
    pub multiplier: f64,
    pub entries: Vec<RoundEntry>,
}

impl RoundSnapshot {
    pub fn newly_fixed(&self) -> impl Iterator<Item = &RoundEntry> {
        self.entries.iter().filter(|e| e.status.is_fixed())
    }
}

/// One active municipality's values in a round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundEntry {
    pub index: usize,
    pub need_share: f64,
    pub subtotal: f64,
    pub final_amount: f64,
    /// `Pending`, `Floored` or `RoundOneRestored`.
    pub status: Status,
}

/// Running per-municipality state between rounds.
#[derive(Clone, Debug)]
struct WorkingRow {
    base_amount: f64,
    need_share: f64,
    subtotal: f64,
    final_amount: f64,
    status: Status,
    round_settled: u32,
    first_round_subtotal: f64,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Iterative floor-enforcing allocation engine.
///
/// # Algorithm
///
/// 1. `base_amount = reference_value × base_percent`, fixed for all rounds.
/// 2. Each round distributes `total_budget − fixed_total − base_sum` over the
///    active municipalities in proportion to `need_count`.
/// 3. An active municipality whose subtotal falls below `minimum_amount` is
///    fixed: at its round-1 subtotal if that cleared the floor and this is
///    round 2 or later, otherwise at the minimum amount.
/// 4. The first round that fixes nobody ends the loop; everyone still active
///    is settled as `OK` at that round's subtotal.
/// 5. Amounts are rounded to whole units and the rounding delta is booked on
///    the largest payout.
#[derive(Clone, Debug)]
pub struct AllocationEngine {
    config: EngineConfig,
}

impl AllocationEngine {
    /// Create an engine; fails if any parameter is out of range.
    pub fn new(config: EngineConfig) -> Result<Self, AllocationError> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full allocation over `records`.
    pub fn compute(&self, records: &[MunicipalityRecord]) -> Result<Allocation, AllocationError> {
        validate_records(records)?;

        let cfg = &self.config;
        let mut trace = TraceLog::new();
        let mut diagnostics = Vec::new();

        trace.push(format!(
            "parameters total_budget={:.2} minimum_amount={:.2} base_percent={:.3} \
             max_rounds={} municipalities={}",
            cfg.total_budget,
            cfg.minimum_amount,
            cfg.base_percent,
            cfg.max_rounds,
            records.len()
        ));

        let mut rows: Vec<WorkingRow> = records
            .iter()
            .map(|r| WorkingRow {
                base_amount: r.reference_value * cfg.base_percent,
                need_share: 0.0,
                subtotal: 0.0,
                final_amount: 0.0,
                status: Status::Pending,
                round_settled: 0,
                first_round_subtotal: 0.0,
            })
            .collect();

        let mut fixed: BTreeSet<usize> = BTreeSet::new();
        let mut rounds_run = 0;
        let mut converged = false;

        for round in 1..=cfg.max_rounds {
            let active: Vec<usize> = (0..records.len()).filter(|i| !fixed.contains(i)).collect();
            if active.is_empty() {
                trace.push(format!("all municipalities fixed after {rounds_run} round(s)"));
                converged = true;
                break;
            }
            rounds_run = round;

            let snap = self.compute_round(round, records, &rows, &fixed, &active);

            debug!(
                round,
                active = active.len(),
                available_budget = snap.available_budget,
                base_sum = snap.base_sum,
                residual_budget = snap.residual_budget,
                multiplier = snap.multiplier,
                "allocation round"
            );
            trace.push(format!(
                "round {round}: available_budget={:.2} base_sum={:.2} residual_budget={:.2} \
                 need_sum={} multiplier={:.6}",
                snap.available_budget,
                snap.base_sum,
                snap.residual_budget,
                snap.need_sum,
                snap.multiplier
            ));

            if snap.residual_budget < 0.0 {
                if cfg.reject_negative_residual {
                    return Err(AllocationError::NegativeResidual {
                        round,
                        residual_budget: snap.residual_budget,
                    });
                }
                let diag = Diagnostic::NegativeResidual {
                    round,
                    residual_budget: snap.residual_budget,
                };
                warn!(round, residual_budget = snap.residual_budget, "negative residual budget");
                trace.push(format!("WARNING {diag}"));
                diagnostics.push(diag);
            }

            let newly_fixed = merge_round(&snap, &mut rows, records, &mut trace);

            if newly_fixed.is_empty() {
                for i in &active {
                    rows[*i].status = Status::Ok;
                }
                trace.push(format!("converged after {round} round(s)"));
                converged = true;
                break;
            }

            trace.push(format!("round {round}: newly_fixed={}", newly_fixed.len()));
            fixed.extend(newly_fixed);
        }

        if !converged && fixed.len() == records.len() {
            trace.push(format!("all municipalities fixed after {rounds_run} round(s)"));
            converged = true;
        }

        let convergence = if converged {
            Convergence::Converged { rounds: rounds_run }
        } else {
            let diag = Diagnostic::RoundCapReached {
                rounds: rounds_run,
                still_active: records.len() - fixed.len(),
            };
            warn!(rounds = rounds_run, "allocation round cap reached without convergence");
            trace.push(format!("WARNING {diag}"));
            diagnostics.push(diag);
            Convergence::RoundCapReached { rounds: rounds_run }
        };

        // ── Rounding + reconciliation ────────────────────────────────────────
        let unrounded: Vec<f64> = rows.iter().map(|r| r.final_amount).collect();
        let (settled, rounding) = round_and_reconcile(&unrounded, cfg.total_budget)
            .ok_or(AllocationError::AmountOutOfRange)?;

        trace.push(format!(
            "rounding: sum_before={:.2} sum_after={} delta={}",
            rounding.sum_unrounded, rounding.sum_rounded, rounding.delta
        ));
        if let Some(adj) = &rounding.adjustment {
            trace.push(format!(
                "rounding adjustment: {} {} -> {} (delta {})",
                records[adj.index].name, adj.before, adj.after, rounding.delta
            ));
        }

        let results: Vec<AllocationResult> = records
            .iter()
            .zip(rows)
            .zip(settled)
            .enumerate()
            .map(|(i, ((rec, row), final_amount))| AllocationResult {
                name: rec.name.clone(),
                reference_value: rec.reference_value,
                need_count: rec.need_count,
                base_amount: row.base_amount,
                need_share: row.need_share,
                subtotal: row.subtotal,
                final_amount,
                final_amount_unrounded: row.final_amount,
                status: row.status,
                rounding_adjusted: rounding.adjustment.as_ref().is_some_and(|a| a.index == i),
                round_settled: row.round_settled,
                first_round_subtotal: row.first_round_subtotal,
            })
            .collect();

        // ── Validation ───────────────────────────────────────────────────────
        let validation = validate_total(&results, cfg.total_budget, cfg.validation_tolerance);
        trace.push(format!(
            "validation: expected={:.2} actual={:.2} difference={:.2} ok={}",
            validation.expected, validation.actual, validation.difference, validation.ok
        ));
        if !validation.ok {
            let diag = Diagnostic::TotalMismatch {
                expected: validation.expected,
                actual: validation.actual,
            };
            warn!(
                expected = validation.expected,
                actual = validation.actual,
                "settled total differs from budget"
            );
            trace.push(format!("WARNING {diag}"));
            diagnostics.push(diag);
        }

        Ok(Allocation {
            config: cfg.clone(),
            results,
            trace,
            convergence,
            rounding,
            validation,
            diagnostics,
        })
    }

    /// Compute one round over the `active` municipalities.
    ///
    /// Pure: reads the working table and the fixed set, returns a snapshot.
    fn compute_round(
        &self,
        round: u32,
        records: &[MunicipalityRecord],
        rows: &[WorkingRow],
        fixed: &BTreeSet<usize>,
        active: &[usize],
    ) -> RoundSnapshot {
        let cfg = &self.config;

        let fixed_total: f64 = fixed.iter().map(|i| rows[*i].final_amount).sum();
        let available_budget = cfg.total_budget - fixed_total;
        let base_sum: f64 = active.iter().map(|i| rows[*i].base_amount).sum();
        let residual_budget = available_budget - base_sum;
        let need_sum: f64 = active.iter().map(|i| records[*i].need_count).sum();
        let multiplier = if need_sum > 0.0 {
            residual_budget / need_sum
        } else {
            0.0
        };

        let entries = active
            .iter()
            .map(|&i| {
                let need_share = records[i].need_count * multiplier;
                let subtotal = rows[i].base_amount + need_share;
                let first_round_subtotal = if round == 1 {
                    subtotal
                } else {
                    rows[i].first_round_subtotal
                };

                let (final_amount, status) = if subtotal < cfg.minimum_amount {
                    if round > 1 && first_round_subtotal >= cfg.minimum_amount {
                        (
                            first_round_subtotal,
                            Status::RoundOneRestored {
                                value: first_round_subtotal,
                            },
                        )
                    } else {
                        (cfg.minimum_amount, Status::Floored { round })
                    }
                } else {
                    (subtotal, Status::Pending)
                };

                RoundEntry {
                    index: i,
                    need_share,
                    subtotal,
                    final_amount,
                    status,
                }
            })
            .collect();

        RoundSnapshot {
            round,
            fixed_total,
            available_budget,
            base_sum,
            residual_budget,
            need_sum,
            multiplier,
            entries,
        }
    }
}

/// Merge a snapshot into the working table; returns the newly fixed indices.
fn merge_round(
    snap: &RoundSnapshot,
    rows: &mut [WorkingRow],
    records: &[MunicipalityRecord],
    trace: &mut TraceLog,
) -> Vec<usize> {
    let mut newly_fixed = Vec::new();

    for e in &snap.entries {
        let row = &mut rows[e.index];
        row.need_share = e.need_share;
        row.subtotal = e.subtotal;
        row.final_amount = e.final_amount;
        row.status = e.status.clone();
        if snap.round == 1 {
            row.first_round_subtotal = e.subtotal;
        }

        match &e.status {
            Status::Floored { .. } => {
                row.round_settled = snap.round;
                newly_fixed.push(e.index);
                trace.push(format!(
                    "round {}: {} floored at minimum {:.2} (subtotal {:.2})",
                    snap.round, records[e.index].name, e.final_amount, e.subtotal
                ));
            }
            Status::RoundOneRestored { value } => {
                row.round_settled = snap.round;
                newly_fixed.push(e.index);
                trace.push(format!(
                    "round {}: {} restored to round-1 value {:.2} (subtotal {:.2})",
                    snap.round, records[e.index].name, value, e.subtotal
                ));
            }
            Status::Pending | Status::Ok => {}
        }
    }

    newly_fixed
}

/// Convenience wrapper: validate `config`, then compute over `records`.
pub fn compute(
    config: &EngineConfig,
    records: &[MunicipalityRecord],
) -> Result<Allocation, AllocationError> {
    AllocationEngine::new(config.clone())?.compute(records)
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate_config(cfg: &EngineConfig) -> Result<(), AllocationError> {
    let invalid = |field: &'static str, reason: &str| AllocationError::InvalidConfiguration {
        field,
        reason: reason.to_string(),
    };

    if !cfg.total_budget.is_finite() || cfg.total_budget <= 0.0 {
        return Err(invalid("total_budget", "must be a finite number > 0"));
    }
    if cfg.total_budget > MAX_AMOUNT {
        return Err(invalid("total_budget", "must not exceed 1e15"));
    }
    if !cfg.minimum_amount.is_finite() || cfg.minimum_amount < 0.0 {
        return Err(invalid("minimum_amount", "must be a finite number >= 0"));
    }
    if cfg.minimum_amount > MAX_AMOUNT {
        return Err(invalid("minimum_amount", "must not exceed 1e15"));
    }
    if !cfg.base_percent.is_finite() || !(0.0..=1.0).contains(&cfg.base_percent) {
        return Err(invalid("base_percent", "must be within [0, 1]"));
    }
    if cfg.max_rounds == 0 {
        return Err(invalid("max_rounds", "must be >= 1"));
    }
    if !cfg.validation_tolerance.is_finite() || cfg.validation_tolerance < 0.0 {
        return Err(invalid("validation_tolerance", "must be a finite number >= 0"));
    }
    Ok(())
}

fn validate_records(records: &[MunicipalityRecord]) -> Result<(), AllocationError> {
    if records.is_empty() {
        return Err(AllocationError::EmptyInput);
    }

    for (index, r) in records.iter().enumerate() {
        let invalid = |reason: &str| AllocationError::InvalidRecord {
            index,
            name: r.name.clone(),
            reason: reason.to_string(),
        };
        if r.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !r.reference_value.is_finite() || r.reference_value < 0.0 {
            return Err(invalid("reference_value must be a finite number >= 0"));
        }
        if !r.need_count.is_finite() || r.need_count < 0.0 {
            return Err(invalid("need_count must be a finite number >= 0"));
        }
    }
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
