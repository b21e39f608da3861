//! gs-report
//!
//! Output side of an allocation run: the export directory (manifest,
//! results CSV, summary JSON, trace log) and the plain-text report.

mod export;
mod format;
mod text;

pub use export::{
    export_run, write_results_csv, write_results_csv_to, write_summary_json, ArtifactList,
    ExportRunArgs, ExportRunResult, RunManifest, RunSummary, MANIFEST_SCHEMA_VERSION,
};
pub use format::{group_thousands, need_count, whole_units};
pub use text::render_text_report;
