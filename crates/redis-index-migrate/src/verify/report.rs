//! Plain-text rendering of comparison reports.

use std::collections::BTreeSet;
use std::fmt::Write;

use super::types::{Inventory, InventoryComparison, KeyComparisonReport, KeyPattern, TypedKey};

const RULE: &str = "--------------------------------------------------";

/// Render an index-name comparison: the three sorted lists, a summary and
/// scan times.
pub fn render_index_report(comparison: &InventoryComparison) -> String {
    let mut out = String::new();
    let result = &comparison.result;

    let _ = writeln!(out, "Index Comparison Results:");
    let _ = writeln!(out, "{}", RULE);
    push_errors(&mut out, comparison);
    push_list(&mut out, "Indexes only in source:", &result.only_in_source);
    push_list(&mut out, "Indexes only in target:", &result.only_in_target);
    push_list(&mut out, "Indexes in both:", &result.in_both);

    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "Total indexes in source: {}", comparison.source.len());
    let _ = writeln!(out, "Total indexes in target: {}", comparison.target.len());
    let _ = writeln!(out, "Indexes only in source: {}", result.only_in_source.len());
    let _ = writeln!(out, "Indexes only in target: {}", result.only_in_target.len());
    let _ = writeln!(out, "Indexes in both: {}", result.in_both.len());

    let _ = writeln!(out, "\nScan Times:");
    push_scan_time(&mut out, "Source", &comparison.source);
    push_scan_time(&mut out, "Target", &comparison.target);
    out
}

/// Render a key comparison: summary counts, scan times and key patterns.
///
/// With debug detail the report also lists the typed only-in-source and
/// only-in-target samples, every target key and the source key patterns.
pub fn render_key_report(report: &KeyComparisonReport) -> String {
    let mut out = String::new();
    let comparison = &report.comparison;
    let result = &comparison.result;

    let _ = writeln!(out, "Key Comparison Results:");
    let _ = writeln!(out, "{}", RULE);
    push_errors(&mut out, comparison);

    if let Some(ref detail) = report.debug {
        let _ = writeln!(out, "\nKeys only in source:");
        push_sample(&mut out, &detail.only_in_source_sample, result.only_in_source.len());

        let _ = writeln!(out, "\nKeys only in target:");
        push_sample(&mut out, &detail.only_in_target_sample, result.only_in_target.len());

        let _ = writeln!(out, "\nKeys in target:");
        push_typed(&mut out, &detail.target_keys);
    }

    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "Total keys in source: {}", comparison.source.len());
    let _ = writeln!(out, "Total keys in target: {}", comparison.target.len());
    let _ = writeln!(out, "Keys only in source: {}", result.only_in_source.len());
    let _ = writeln!(out, "Keys only in target: {}", result.only_in_target.len());
    let _ = writeln!(out, "Keys in both: {}", result.in_both.len());

    let _ = writeln!(out, "\nScan Times:");
    push_scan_time(&mut out, "Source", &comparison.source);
    push_scan_time(&mut out, "Target", &comparison.target);

    let _ = writeln!(out, "\nKey Pattern Analysis:");
    if report.debug.is_some() {
        let _ = writeln!(out, "\nSource Key Patterns:");
        push_patterns(&mut out, &report.source_patterns);
    }
    let _ = writeln!(out, "\nTarget Key Patterns:");
    push_patterns(&mut out, &report.target_patterns);
    out
}

fn push_errors(out: &mut String, comparison: &InventoryComparison) {
    for inventory in [&comparison.source, &comparison.target] {
        if let Some(ref error) = inventory.error {
            let _ = writeln!(
                out,
                "Warning: could not read {} {}: {}",
                inventory.origin, inventory.kind, error
            );
        }
    }
}

fn push_list(out: &mut String, title: &str, names: &BTreeSet<String>) {
    let _ = writeln!(out, "\n{}", title);
    if names.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for name in names {
        let _ = writeln!(out, "- {}", name);
    }
}

fn push_typed(out: &mut String, keys: &[TypedKey]) {
    for k in keys {
        let _ = writeln!(out, "- {} (Type: {})", k.key, k.key_type);
    }
}

/// Typed sample followed by a count of the keys left out of it.
fn push_sample(out: &mut String, sample: &[TypedKey], total: usize) {
    push_typed(out, sample);
    let hidden = total.saturating_sub(sample.len());
    if hidden > 0 {
        let _ = writeln!(out, "... and {} more keys", hidden);
    }
}

fn push_patterns(out: &mut String, patterns: &[KeyPattern]) {
    for p in patterns {
        let _ = writeln!(out, "- {}: {} keys", p.pattern, p.count);
    }
}

fn push_scan_time(out: &mut String, label: &str, inventory: &Inventory) {
    let _ = writeln!(
        out,
        "{} scan time: {:.2} seconds",
        label,
        inventory.scan_duration.as_secs_f64()
    );
}
