//! Run export directory: `<exports_root>/<run_id>/`.
//!
//! | File            | Contents                                           |
//! |-----------------|----------------------------------------------------|
//! | `manifest.json` | run id, creation time, config hash, artifact names |
//! | `results.csv`   | one row per municipality plus a `TOTAL` row        |
//! | `summary.json`  | parameters, aggregates, convergence, diagnostics   |
//! | `trace.log`     | the computation trace, one event per line          |
//! | `report.txt`    | the plain-text report                              |

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gs_engine::{
    Allocation, AllocationSummary, Cents, Convergence, Diagnostic, EngineConfig, RoundingReport,
    ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::text::render_text_report;

pub const MANIFEST_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub config_hash: String,
    /// Input file the records came from; `None` for the built-in example.
    pub input: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub manifest_json: String,
    pub results_csv: String,
    pub summary_json: String,
    pub trace_log: String,
    pub report_txt: String,
}

impl Default for ArtifactList {
    fn default() -> Self {
        Self {
            manifest_json: "manifest.json".to_string(),
            results_csv: "results.csv".to_string(),
            summary_json: "summary.json".to_string(),
            trace_log: "trace.log".to_string(),
            report_txt: "report.txt".to_string(),
        }
    }
}

/// Machine-readable run summary (`summary.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub parameters: EngineConfig,
    pub summary: AllocationSummary,
    pub rounds: u32,
    pub convergence: Convergence,
    pub rounding: RoundingReport,
    /// Name of the municipality that absorbed the rounding delta.
    pub rounding_target: Option<String>,
    pub validation: ValidationReport,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    pub fn from_allocation(alloc: &Allocation) -> Self {
        Self {
            parameters: alloc.config.clone(),
            summary: alloc.summary(),
            rounds: alloc.rounds(),
            convergence: alloc.convergence,
            rounding: alloc.rounding.clone(),
            rounding_target: alloc
                .rounding
                .adjustment
                .as_ref()
                .and_then(|a| alloc.results.get(a.index))
                .map(|r| r.name.clone()),
            validation: alloc.validation.clone(),
            diagnostics: alloc.diagnostics.clone(),
        }
    }
}

pub struct ExportRunArgs<'a> {
    pub exports_root: &'a Path,
    pub run_id: Uuid,
    pub config_hash: &'a str,
    pub input: Option<&'a str>,
    pub allocation: &'a Allocation,
}

pub struct ExportRunResult {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

pub fn export_run(args: ExportRunArgs<'_>) -> Result<ExportRunResult> {
    let run_dir = args.exports_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    let artifacts = ArtifactList::default();

    write_results_csv(&run_dir.join(&artifacts.results_csv), args.allocation)?;
    write_summary_json(&run_dir.join(&artifacts.summary_json), args.allocation)?;
    write_text(&run_dir.join(&artifacts.trace_log), &args.allocation.trace.to_string())?;
    write_text(
        &run_dir.join(&artifacts.report_txt),
        &format!("{}\n", render_text_report(args.allocation)),
    )?;

    let manifest = RunManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        run_id: args.run_id,
        config_hash: args.config_hash.to_string(),
        input: args.input.map(str::to_string),
        created_at_utc: Utc::now(),
        artifacts,
    };

    let manifest_path = run_dir.join(&manifest.artifacts.manifest_json);
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest failed")?;
    write_text(&manifest_path, &format!("{json}\n"))?;

    Ok(ExportRunResult {
        run_dir,
        manifest_path,
    })
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    name: &'a str,
    reference_value: String,
    need_count: String,
    base_amount: String,
    need_share: String,
    subtotal: String,
    final_amount: String,
    final_amount_unrounded: String,
    status: String,
    round_settled: Option<u32>,
    first_round_subtotal: String,
}

/// Results table with a trailing `TOTAL` row (sums of the amount columns).
pub fn write_results_csv(path: &Path, alloc: &Allocation) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("create results csv failed: {}", path.display()))?;
    write_results_csv_to(file, alloc)
        .with_context(|| format!("write results csv failed: {}", path.display()))
}

pub fn write_results_csv_to<W: Write>(w: W, alloc: &Allocation) -> Result<()> {
    let mut wrt = csv::WriterBuilder::new().from_writer(w);

    for r in &alloc.results {
        wrt.serialize(ResultRow {
            name: &r.name,
            reference_value: format!("{:.2}", r.reference_value),
            need_count: format!("{}", r.need_count),
            base_amount: format!("{:.2}", r.base_amount),
            need_share: format!("{:.2}", r.need_share),
            subtotal: format!("{:.2}", r.subtotal),
            final_amount: r.final_amount.to_string(),
            final_amount_unrounded: format!("{:.2}", r.final_amount_unrounded),
            status: r.status_label(),
            round_settled: Some(r.round_settled),
            first_round_subtotal: format!("{:.2}", r.first_round_subtotal),
        })?;
    }

    let sum = |f: fn(&gs_engine::AllocationResult) -> f64| -> f64 {
        alloc.results.iter().map(f).sum()
    };
    let total: Cents = alloc.results.iter().map(|r| r.final_amount).sum();
    wrt.serialize(ResultRow {
        name: "TOTAL",
        reference_value: format!("{:.2}", sum(|r| r.reference_value)),
        need_count: format!("{}", sum(|r| r.need_count)),
        base_amount: format!("{:.2}", sum(|r| r.base_amount)),
        need_share: String::new(),
        subtotal: String::new(),
        final_amount: total.to_string(),
        final_amount_unrounded: format!("{:.2}", sum(|r| r.final_amount_unrounded)),
        status: String::new(),
        round_settled: None,
        first_round_subtotal: String::new(),
    })?;

    wrt.flush()?;
    Ok(())
}

pub fn write_summary_json(path: &Path, alloc: &Allocation) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunSummary::from_allocation(alloc))
        .context("serialize summary failed")?;
    write_text(path, &format!("{json}\n"))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write failed: {}", path.display()))
}
