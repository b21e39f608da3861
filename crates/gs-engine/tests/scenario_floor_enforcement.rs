//! Scenario: iterative minimum-amount floor.
//!
//! Invariants under test:
//! - A municipality below the minimum in round 1 is fixed at the minimum.
//! - The freed budget is redistributed over the remaining municipalities.
//! - Fixed municipalities keep their amount in every later round.
//! - Base amounts are identical in every round.

use gs_engine::{compute, Cents, EngineConfig, MunicipalityRecord, Status};

fn two_towns() -> Vec<MunicipalityRecord> {
    vec![
        MunicipalityRecord::new("A", 20_000.0, 10.0),
        MunicipalityRecord::new("B", 5_000.0, 5.0),
    ]
}

#[test]
fn scenario_small_town_is_floored_and_budget_redistributed() {
    let alloc = compute(&EngineConfig::new(27_000.0), &two_towns()).unwrap();

    let a = alloc.result("A").unwrap();
    let b = alloc.result("B").unwrap();

    // Round 1: multiplier 966.67 -> B = 7_333.33 < 12_500.
    assert_eq!(b.status, Status::Floored { round: 1 });
    assert_eq!(b.round_settled, 1);
    assert_eq!(b.final_amount, Cents::from_units(12_500));
    assert!((b.first_round_subtotal - 7_333.333_333).abs() < 1e-3);

    // Round 2: residual 14_500 - 10_000 = 4_500 over 10 cases.
    assert_eq!(a.status, Status::Ok);
    assert_eq!(a.round_settled, 0);
    assert_eq!(a.need_share, 4_500.0);
    assert_eq!(a.subtotal, 14_500.0);
    assert_eq!(a.final_amount, Cents::from_units(14_500));
    assert_eq!(a.base_amount, 10_000.0);

    assert_eq!(alloc.rounds(), 2);
    assert!(alloc.convergence.is_converged());
    assert!(alloc.validation.ok);
}

#[test]
fn scenario_floor_decisions_appear_in_trace() {
    let alloc = compute(&EngineConfig::new(27_000.0), &two_towns()).unwrap();

    assert!(alloc.trace.contains("round 1: B floored at minimum 12500.00"));
    assert!(alloc.trace.contains("round 1: newly_fixed=1"));
    assert!(alloc.trace.contains("round 2: available_budget=14500.00"));
    assert!(alloc.trace.contains("converged after 2 round(s)"));
    assert!(alloc.trace.lines()[0].starts_with("parameters total_budget=27000.00"));
}

#[test]
fn scenario_everyone_floored_terminates() {
    // Budget only covers the floors; all three fixed in round 1.
    let records = vec![
        MunicipalityRecord::new("A", 0.0, 1.0),
        MunicipalityRecord::new("B", 0.0, 1.0),
        MunicipalityRecord::new("C", 0.0, 1.0),
    ];
    let cfg = EngineConfig::new(300.0).with_minimum_amount(150.0);
    let alloc = compute(&cfg, &records).unwrap();

    for r in &alloc.results {
        assert_eq!(r.status, Status::Floored { round: 1 });
    }
    assert!(alloc.convergence.is_converged());
    assert_eq!(alloc.rounds(), 1);
    assert!(alloc.trace.contains("all municipalities fixed after 1 round(s)"));

    // 450 settled against a 300 budget: reconciliation books -150 on A.
    assert_eq!(alloc.results[0].final_amount, Cents::from_units(0));
    assert!(alloc.results[0].rounding_adjusted);
    assert!(alloc.validation.ok);
}
