//! Plain-text result report, suitable for pasting into mail or a memo.

use gs_engine::{Allocation, Cents};

use crate::format::{group_thousands, need_count, whole_units};

const TITLE: &str = "GRANT ALLOCATION RESULT";

pub fn render_text_report(alloc: &Allocation) -> String {
    let cfg = &alloc.config;
    let mut lines: Vec<String> = Vec::new();

    lines.push(TITLE.to_string());
    lines.push("=".repeat(50));
    lines.push(format!("Total budget: {}", group_thousands(cfg.total_budget, 2)));
    lines.push(format!("Minimum amount: {}", group_thousands(cfg.minimum_amount, 2)));
    lines.push(format!("Base percent: {:.1}%", cfg.base_percent * 100.0));
    lines.push(String::new());

    lines.push(format!(
        "{:<20} {:>12} {:>10} {:>12} Status",
        "Municipality", "Reference", "Need", "Final"
    ));
    lines.push("-".repeat(80));

    for r in &alloc.results {
        lines.push(format!(
            "{:<20} {:>12} {:>10} {:>12} {}",
            r.name,
            group_thousands(r.reference_value, 0),
            need_count(r.need_count),
            whole_units(r.final_amount),
            r.status_label()
        ));
    }

    let total: Cents = alloc.results.iter().map(|r| r.final_amount).sum();
    lines.push("-".repeat(80));
    lines.push(format!(
        "{:<20} {:<12} {:<10} {:>12}",
        "SUM",
        "",
        "",
        whole_units(total)
    ));

    lines.join("\n")
}
