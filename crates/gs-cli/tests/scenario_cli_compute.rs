//! `grant-split compute` end to end.
//!
//! GREEN when:
//! - A valid CSV prints the key=value summary and the text report.
//! - `--no-export` writes nothing; otherwise `<exports_root>/<run_id>/` exists.
//! - Config layers and flags combine, flags winning.
//! - A missing budget and a mismatch under `--fail-on-mismatch` fail the run.

use predicates::prelude::*;
use std::fs;

const TWO_TOWNS: &str = "Kommune,Wert 2019 (€),Kinder U3 im SGB-II-Bezug\nA,20000,10\nB,5000,5\n";

#[test]
fn compute_prints_summary_without_export() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("kommunen.csv");
    fs::write(&input, TWO_TOWNS)?;

    let mut cmd = assert_cmd::Command::cargo_bin("grant-split")?;
    cmd.current_dir(dir.path())
        .args(["compute", "--input"])
        .arg(&input)
        .args(["--total-budget", "27000", "--no-export"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("import_ok=true records=2 rejected=0"))
        .stdout(predicate::str::contains("allocation_ok=true rounds=2 converged=true"))
        .stdout(predicate::str::contains("grand_total=27000.00"))
        .stdout(predicate::str::contains("validation_ok=true"))
        .stdout(predicate::str::contains("floored at round 1"))
        .stdout(predicate::str::contains("export_dir=").not());

    assert!(!dir.path().join("exports").exists());
    Ok(())
}

#[test]
fn compute_writes_export_dir_under_configured_root() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("kommunen.csv");
    fs::write(&input, TWO_TOWNS)?;
    let cfg = dir.path().join("base.yaml");
    fs::write(
        &cfg,
        "allocation:\n  total_budget: 500000\nexport:\n  root: out\n",
    )?;

    let mut cmd = assert_cmd::Command::cargo_bin("grant-split")?;
    cmd.current_dir(dir.path())
        .args(["compute", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&cfg)
        .args(["--total-budget", "27000"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output)?;

    assert!(stdout.contains("grand_total=27000.00"), "flag must win: {stdout}");
    let export_line = stdout
        .lines()
        .find(|l| l.starts_with("export_dir="))
        .expect("export_dir line");
    let export_dir = std::path::PathBuf::from(export_line.trim_start_matches("export_dir="));
    let export_dir = if export_dir.is_absolute() {
        export_dir
    } else {
        dir.path().join(export_dir)
    };
    assert!(export_dir.starts_with(dir.path().join("out")));
    assert!(export_dir.join("manifest.json").is_file());
    assert!(export_dir.join("results.csv").is_file());
    Ok(())
}

#[test]
fn compute_without_budget_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("kommunen.csv");
    fs::write(&input, TWO_TOWNS)?;

    let mut cmd = assert_cmd::Command::cargo_bin("grant-split")?;
    cmd.current_dir(dir.path())
        .args(["compute", "--no-export", "--input"])
        .arg(&input);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_MISSING_TOTAL_BUDGET"));
    Ok(())
}

#[test]
fn compute_fails_on_mismatch_when_asked() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("kommunen.csv");
    fs::write(&input, "Name,Wert 2019,U3\nA,0,1\nB,0,1\n")?;

    let mut cmd = assert_cmd::Command::cargo_bin("grant-split")?;
    cmd.current_dir(dir.path())
        .args(["compute", "--no-export", "--input"])
        .arg(&input)
        .args([
            "--total-budget",
            "1000.5",
            "--minimum-amount",
            "0",
            "--fail-on-mismatch",
        ]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("validation_ok=false"))
        .stderr(predicate::str::contains("TOTAL_MISMATCH"));
    Ok(())
}

#[test]
fn compute_strict_config_rejects_unknown_keys() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("kommunen.csv");
    fs::write(&input, TWO_TOWNS)?;
    let cfg = dir.path().join("typo.yaml");
    fs::write(&cfg, "allocation:\n  total_budgett: 27000\n")?;

    let mut cmd = assert_cmd::Command::cargo_bin("grant-split")?;
    cmd.current_dir(dir.path())
        .args(["compute", "--no-export", "--strict-config", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&cfg);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
    Ok(())
}
