//! Command handler modules for gs-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod compute;
pub mod import;

use anyhow::{Context, Result};
use gs_config::{report_unused_keys, LoadedConfig, UnusedKeyPolicy};
use gs_ingest::ImportReport;
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config (or the empty config when no paths are given) and run
/// the unused-key guard.
pub fn load_config(paths: &[String], policy: UnusedKeyPolicy) -> Result<LoadedConfig> {
    let loaded = if paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        gs_config::load_layered_yaml(&path_refs).context("load config failed")?
    };

    let report = report_unused_keys(&loaded.config_json, policy)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "config key is not read by anything");
    }

    Ok(loaded)
}

/// Print the import outcome as `key=value` lines.
pub fn print_import_report(report: &ImportReport) {
    println!(
        "import_ok=true records={} rejected={} skipped_blank={} header_line={} delimiter={} \
         encoding={}",
        report.records.len(),
        report.rejected.len(),
        report.skipped_blank,
        report.header_line,
        report.delimiter,
        report.encoding
    );
    for r in &report.rejected {
        println!("rejected line={} name={} reason={}", r.line, r.name, r.reason);
    }
}
