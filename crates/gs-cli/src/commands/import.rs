//! `import-check` and `template` command handlers.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::print_import_report;

pub fn run_import_check(input: &Path) -> Result<()> {
    let report = gs_ingest::import_csv_file(input)
        .with_context(|| format!("import failed for {}", input.display()))?;
    print_import_report(&report);

    for rec in &report.records {
        println!(
            "record name={} reference_value={:.2} need_count={}",
            rec.name, rec.reference_value, rec.need_count
        );
    }
    Ok(())
}

pub fn run_template(path: &Path) -> Result<()> {
    gs_ingest::write_template(path)
        .with_context(|| format!("write template failed for {}", path.display()))?;
    info!(path = %path.display(), "import template written");
    println!("template_written={}", path.display());
    Ok(())
}
