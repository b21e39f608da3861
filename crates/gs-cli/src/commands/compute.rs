//! `compute` and `example` command handlers.
//!
//! Both run the same pipeline: settings → engine → stdout summary → export.

use anyhow::{bail, Context, Result};
use gs_config::{LoadedConfig, Overrides, Settings, UnusedKeyPolicy};
use gs_engine::{Allocation, MunicipalityRecord, EXAMPLE_TOTAL_BUDGET};
use gs_report::{export_run, render_text_report, ExportRunArgs, RunSummary};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_config, print_import_report};

pub struct ComputeArgs {
    pub input: PathBuf,
    pub config_paths: Vec<String>,
    pub overrides: Overrides,
    pub strict_config: bool,
    pub no_export: bool,
}

/// Execute `grant-split compute`.
pub fn run_compute(args: ComputeArgs) -> Result<()> {
    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let loaded = load_config(&args.config_paths, policy)?;
    let mut settings = loaded.settings()?;
    settings.apply(&args.overrides);

    let report = gs_ingest::import_csv_file(&args.input)
        .with_context(|| format!("import failed for {}", args.input.display()))?;
    if report.encoding != "UTF-8" {
        warn!(encoding = report.encoding, "input is not UTF-8; decoded with fallback encoding");
    }
    for r in &report.rejected {
        warn!(line = r.line, name = %r.name, reason = %r.reason, "row rejected");
    }
    print_import_report(&report);

    let input = args.input.display().to_string();
    run_pipeline(&report.records, &settings, &loaded, Some(&input), args.no_export)
}

/// Execute `grant-split example`.
pub fn run_example(mut overrides: Overrides, no_export: bool) -> Result<()> {
    overrides.total_budget = overrides.total_budget.or(Some(EXAMPLE_TOTAL_BUDGET));

    let loaded = LoadedConfig::empty()?;
    let mut settings = Settings::default();
    settings.apply(&overrides);

    run_pipeline(&gs_engine::example_records(), &settings, &loaded, None, no_export)
}

fn run_pipeline(
    records: &[MunicipalityRecord],
    settings: &Settings,
    loaded: &LoadedConfig,
    input: Option<&str>,
    no_export: bool,
) -> Result<()> {
    let engine_cfg = settings.engine_config()?;
    info!(
        municipalities = records.len(),
        total_budget = engine_cfg.total_budget,
        "allocation started"
    );

    let alloc = gs_engine::compute(&engine_cfg, records).context("allocation failed")?;
    print_summary(&alloc);
    println!();
    println!("{}", render_text_report(&alloc));

    if !no_export {
        let run_id = Uuid::new_v4();
        let out = export_run(ExportRunArgs {
            exports_root: Path::new(&settings.export.root),
            run_id,
            config_hash: &loaded.config_hash,
            input,
            allocation: &alloc,
        })?;
        info!(run_id = %run_id, dir = %out.run_dir.display(), "export written");
        println!();
        println!("run_id={run_id}");
        println!("export_dir={}", out.run_dir.display());
        println!("manifest_path={}", out.manifest_path.display());
    }

    if settings.validation.fail_on_mismatch && !alloc.validation.ok {
        bail!(
            "TOTAL_MISMATCH: settled total {:.2} differs from budget {:.2} by {:.2} (tolerance {:.2})",
            alloc.validation.actual,
            alloc.validation.expected,
            alloc.validation.difference,
            alloc.validation.tolerance
        );
    }

    Ok(())
}

fn print_summary(alloc: &Allocation) {
    let s = RunSummary::from_allocation(alloc);
    println!(
        "allocation_ok=true rounds={} converged={}",
        s.rounds,
        s.convergence.is_converged()
    );
    println!(
        "total_budget={:.2} grand_total={} municipalities={} at_minimum={}",
        s.parameters.total_budget, s.summary.grand_total, s.summary.count, s.summary.at_minimum
    );
    println!(
        "rounding_delta={} rounding_target={}",
        s.rounding.delta,
        s.rounding_target.as_deref().unwrap_or("-")
    );
    println!(
        "validation_ok={} difference={:.2}",
        s.validation.ok, s.validation.difference
    );
    for d in &s.diagnostics {
        println!("diagnostic={d}");
    }
}
