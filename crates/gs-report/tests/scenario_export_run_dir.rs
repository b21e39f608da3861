//! Scenario: exporting a run writes a complete, self-describing directory.
//!
//! GREEN when:
//! - `<root>/<run_id>/` holds manifest, results, summary, trace and report.
//! - The manifest records run id, config hash and input.
//! - The results CSV ends with a TOTAL row equal to the budget.
//! - The summary names the rounding target and the convergence outcome.

use gs_engine::{compute, EngineConfig, MunicipalityRecord};
use gs_report::{export_run, ExportRunArgs, RunManifest};
use uuid::Uuid;

fn thirds() -> gs_engine::Allocation {
    let records = vec![
        MunicipalityRecord::new("A", 0.0, 1.0),
        MunicipalityRecord::new("B", 0.0, 1.0),
        MunicipalityRecord::new("C", 0.0, 1.0),
    ];
    compute(&EngineConfig::new(100.0).with_minimum_amount(0.0), &records).unwrap()
}

#[test]
fn scenario_export_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let run_id = Uuid::new_v4();
    let alloc = thirds();

    let out = export_run(ExportRunArgs {
        exports_root: dir.path(),
        run_id,
        config_hash: "abc123",
        input: Some("kommunen.csv"),
        allocation: &alloc,
    })
    .unwrap();

    assert_eq!(out.run_dir, dir.path().join(run_id.to_string()));
    for name in ["manifest.json", "results.csv", "summary.json", "trace.log", "report.txt"] {
        assert!(out.run_dir.join(name).is_file(), "missing {name}");
    }

    let manifest: RunManifest =
        serde_json::from_str(&std::fs::read_to_string(&out.manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.run_id, run_id);
    assert_eq!(manifest.config_hash, "abc123");
    assert_eq!(manifest.input.as_deref(), Some("kommunen.csv"));
    assert_eq!(manifest.artifacts.results_csv, "results.csv");

    let trace = std::fs::read_to_string(out.run_dir.join("trace.log")).unwrap();
    assert_eq!(trace, alloc.trace.to_string());
}

#[test]
fn scenario_results_csv_has_total_row() {
    let dir = tempfile::tempdir().unwrap();
    let alloc = thirds();
    let out = export_run(ExportRunArgs {
        exports_root: dir.path(),
        run_id: Uuid::new_v4(),
        config_hash: "h",
        input: None,
        allocation: &alloc,
    })
    .unwrap();

    let mut rdr = csv::Reader::from_path(out.run_dir.join("results.csv")).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "name");
    assert_eq!(&headers[6], "final_amount");
    assert_eq!(&headers[8], "status");

    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][0], "A");
    assert_eq!(&rows[0][6], "34.00");
    assert_eq!(&rows[0][8], "OK + rounding adjustment");
    assert_eq!(&rows[0][9], "0");
    assert_eq!(&rows[3][0], "TOTAL");
    assert_eq!(&rows[3][6], "100.00");
    assert_eq!(&rows[3][9], "");
}

#[test]
fn scenario_summary_json_describes_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let alloc = thirds();
    let out = export_run(ExportRunArgs {
        exports_root: dir.path(),
        run_id: Uuid::new_v4(),
        config_hash: "h",
        input: None,
        allocation: &alloc,
    })
    .unwrap();

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.run_dir.join("summary.json")).unwrap())
            .unwrap();

    assert_eq!(v["rounds"], 1);
    assert_eq!(v["convergence"]["kind"], "converged");
    assert_eq!(v["rounding_target"], "A");
    assert_eq!(v["validation"]["ok"], true);
    assert_eq!(v["summary"]["count"], 3);
    assert_eq!(v["summary"]["grand_total"], 10_000);
    assert_eq!(v["parameters"]["total_budget"], 100.0);
    assert!(v["diagnostics"].as_array().unwrap().is_empty());
}
